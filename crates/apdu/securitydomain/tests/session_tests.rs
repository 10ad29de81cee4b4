//! Security Domain session operations against a scripted card

mod common;

use common::{MockCard, MockProvider, SW_OK, clear_session, secure_session};
use hex_literal::hex;
use sdtoken_apdu_core::{StatusWord, TransportError};
use sdtoken_securitydomain::prelude::*;
use sdtoken_securitydomain::SessionState;

const P256_GENERATOR: [u8; 65] = hex!(
    "04"
    "6B17D1F2E12C4247F8BCE6E563A440F277037D812DEB33A0F4A13945D898C296"
    "4FE342E2FE1A7F9B8EE7EB4A7C0F9E162BCE33576B315ECECBB6406837BF51F5"
);

fn test_static_keys() -> StaticKeys {
    StaticKeys::new([0x00; 16], [0x11; 16], [0x22; 16])
}

#[test]
fn test_session_selects_security_domain() {
    let session = clear_session(MockCard::new().respond(SW_OK));
    assert_eq!(session.state(), SessionState::Initialized);
    assert!(!session.has_secure_channel());
    assert_eq!(
        session.transport().sent()[0].as_ref(),
        hex!("00A4040008A00000015100000000")
    );
}

#[test]
fn test_session_select_failure() {
    let result = SecurityDomainSession::new(
        MockCard::new().respond(hex!("6A82")),
        SecurityDomainConfig::default(),
        None,
    );
    assert!(matches!(result, Err(Error::Status(sw)) if sw == StatusWord::new(0x6A, 0x82)));
}

#[test]
fn test_session_handshake_failure() {
    let result = SecurityDomainSession::new(
        MockCard::new().respond(SW_OK),
        SecurityDomainConfig::default(),
        Some(Box::new(MockProvider::succeeding(0))),
    );
    assert!(matches!(result, Err(Error::SecureChannel(_))));
}

#[test]
fn test_put_static_keys_end_to_end() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("01 E14D5D 098542 C65591 9000"));
    let mut session = secure_session(card);
    assert!(session.has_secure_channel());

    let mut keys = test_static_keys();
    session
        .put_static_keys(KeyRef::new(0x01, 0x01), &mut keys, 0x00)
        .unwrap();

    assert!(keys.is_zeroed());
    let sent = session.transport().sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[1].as_ref(),
        hex!(
            "80D80081 43 01"
            "8810 1899564A9DA8DE833D25C71739EAADCE 03 E14D5D"
            "8810 56995E11483713A09E127FB9CE267809 03 098542"
            "8810 DBDE4C54F4410FAE7F2EEACD00AE0219 03 C65591"
        )
    );
}

#[test]
fn test_put_static_keys_kcv_mismatch() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("01 E14D5D 098542 C65592 9000"));
    let mut session = secure_session(card);

    let mut keys = test_static_keys();
    let result = session.put_static_keys(KeyRef::new(0x01, 0x01), &mut keys, 0x00);

    assert!(matches!(result, Err(Error::ChecksumMismatch(_))));
    assert!(keys.is_zeroed());
}

#[test]
fn test_put_static_keys_version_mismatch() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("02 E14D5D 098542 C65591 9000"));
    let mut session = secure_session(card);

    let mut keys = test_static_keys();
    let result = session.put_static_keys(KeyRef::new(0x01, 0x01), &mut keys, 0x00);

    assert!(matches!(result, Err(Error::ChecksumMismatch(_))));
    assert!(keys.is_zeroed());
}

#[test]
fn test_put_static_keys_without_secure_channel() {
    let mut session = clear_session(MockCard::new().respond(SW_OK));

    let mut keys = test_static_keys();
    let result = session.put_static_keys(KeyRef::new(0x01, 0x01), &mut keys, 0x00);

    assert_eq!(result, Err(Error::NoSecureChannel));
    assert!(keys.is_zeroed());
    assert_eq!(session.transport().sent().len(), 1);
}

#[test]
fn test_put_static_keys_wrong_kid() {
    let mut session = secure_session(MockCard::new().respond(SW_OK));

    let mut keys = test_static_keys();
    let result = session.put_static_keys(KeyRef::new(0x13, 0x01), &mut keys, 0x00);

    assert!(matches!(result, Err(Error::InvalidKeyRef(..))));
    assert!(keys.is_zeroed());
    assert_eq!(session.transport().sent().len(), 1);
}

#[test]
fn test_put_static_keys_transport_failure() {
    let card = MockCard::new()
        .respond(SW_OK)
        .fail(TransportError::Cancelled);
    let mut session = secure_session(card);

    let mut keys = test_static_keys();
    let result = session.put_static_keys(KeyRef::new(0x01, 0x01), &mut keys, 0x00);

    assert_eq!(result, Err(Error::Transport(TransportError::Cancelled)));
    assert!(keys.is_zeroed());
}

#[test]
fn test_put_static_keys_status_error() {
    let card = MockCard::new().respond(SW_OK).respond(hex!("6A80"));
    let mut session = secure_session(card);

    let mut keys = test_static_keys();
    let result = session.put_static_keys(KeyRef::new(0x01, 0x01), &mut keys, 0x00);

    assert_eq!(result, Err(Error::Status(StatusWord::new(0x6A, 0x80))));
    assert!(keys.is_zeroed());
}

#[test]
fn test_put_ec_public_key() {
    let card = MockCard::new().respond(SW_OK).respond(hex!("03 9000"));
    let mut session = clear_session(card);

    let key = EcPublicKey::from_sec1_bytes(Curve::P256, &P256_GENERATOR).unwrap();
    session
        .put_ec_public_key(KeyRef::new(0x10, 0x03), &key, 0x00)
        .unwrap();

    let expected = [
        &hex!("80D80010 48 03 B041")[..],
        &P256_GENERATOR,
        &hex!("F00100 00"),
    ]
    .concat();
    assert_eq!(session.transport().sent()[1].as_ref(), expected.as_slice());
}

#[test]
fn test_put_ec_public_key_echo_mismatch() {
    let card = MockCard::new().respond(SW_OK).respond(hex!("04 9000"));
    let mut session = clear_session(card);

    let key = EcPublicKey::from_sec1_bytes(Curve::P256, &P256_GENERATOR).unwrap();
    let result = session.put_ec_public_key(KeyRef::new(0x10, 0x03), &key, 0x00);
    assert!(matches!(result, Err(Error::ChecksumMismatch(_))));
}

#[test]
fn test_put_ec_key_rejects_scp03_slot() {
    let mut session = clear_session(MockCard::new().respond(SW_OK));

    let key = EcPublicKey::from_sec1_bytes(Curve::P256, &P256_GENERATOR).unwrap();
    let result = session.put_ec_public_key(KeyRef::new(0x01, 0x03), &key, 0x00);
    assert!(matches!(result, Err(Error::InvalidKeyRef(..))));
    assert_eq!(session.transport().sent().len(), 1);
}

#[test]
fn test_put_ec_private_key() {
    let card = MockCard::new().respond(SW_OK).respond(hex!("01 9000"));
    let mut session = secure_session(card);

    let scalar: Vec<u8> = (1..=32).collect();
    let mut key = EcPrivateKey::new(Curve::P256, &scalar).unwrap();
    session
        .put_ec_private_key(KeyRef::new(0x13, 0x01), &mut key, 0x00)
        .unwrap();

    assert!(key.is_zeroed());
    assert_eq!(
        session.transport().sent()[1].as_ref(),
        hex!(
            "80D80013 27 01"
            "B120 2C11D959ACCC6F9B9CE35C7ACA65EA974C5FEE4043443551E2A634E78CE4EB11"
            "F00100 00"
        )
    );
}

#[test]
fn test_put_ec_private_key_without_secure_channel() {
    let mut session = clear_session(MockCard::new().respond(SW_OK));

    let scalar: Vec<u8> = (1..=32).collect();
    let mut key = EcPrivateKey::new(Curve::P256, &scalar).unwrap();
    let result = session.put_ec_private_key(KeyRef::new(0x13, 0x01), &mut key, 0x00);

    assert_eq!(result, Err(Error::NoSecureChannel));
    assert!(key.is_zeroed());
}

#[test]
fn test_generate_ec_key() {
    let response = [&hex!("B041")[..], &P256_GENERATOR, &SW_OK].concat();
    let card = MockCard::new().respond(SW_OK).respond(response);
    let mut session = secure_session(card);

    let key = session.generate_ec_key(KeyRef::new(0x13, 0x03), 0x01).unwrap();

    assert_eq!(key.as_bytes().as_ref(), P256_GENERATOR.as_slice());
    assert_eq!(key.to_p256().unwrap(), p256::PublicKey::from_sec1_bytes(&P256_GENERATOR).unwrap());
    assert_eq!(session.transport().sent()[1].as_ref(), hex!("80F101130403F00100"));
}

#[test]
fn test_delete_scp03_by_version() {
    let card = MockCard::new().respond(SW_OK).respond(SW_OK);
    let mut session = secure_session(card);

    session.delete_key(KeyRef::new(0x01, 0x05), false).unwrap();
    assert_eq!(session.transport().sent()[1].as_ref(), hex!("80E4000003D20105"));
}

#[test]
fn test_delete_status_error() {
    let card = MockCard::new().respond(SW_OK).respond(hex!("6A88"));
    let mut session = secure_session(card);

    let result = session.delete_key(KeyRef::new(0x13, 0x02), true);
    assert!(result.as_ref().is_err_and(|e| e.has_status(StatusWord::new(0x6A, 0x88))));
    assert_eq!(session.transport().sent()[1].as_ref(), hex!("80E4000106D00113D20102"));
}

#[test]
fn test_delete_rejects_full_wildcard() {
    let mut session = secure_session(MockCard::new().respond(SW_OK));
    let result = session.delete_key(KeyRef::new(0x00, 0x00), false);
    assert!(matches!(result, Err(Error::InvalidKeyRef(..))));
    assert_eq!(session.transport().sent().len(), 1);
}

#[test]
fn test_store_allowlist_and_ca_issuer() {
    let card = MockCard::new().respond(SW_OK).respond(SW_OK).respond(SW_OK);
    let mut session = secure_session(card);

    session
        .store_allowlist(KeyRef::new(0x10, 0x03), &[hex!("7F4C").to_vec()])
        .unwrap();
    session
        .store_ca_issuer(KeyRef::new(0x10, 0x03), &hex!("AABBCCDD"))
        .unwrap();

    let sent = session.transport().sent();
    assert_eq!(sent[1].as_ref(), hex!("80E290000C A604 83021003 7004 93027F4C"));
    assert_eq!(sent[2].as_ref(), hex!("80E290000F A60D 800100 4204AABBCCDD 83021003"));
}

#[test]
fn test_store_certificate_bundle() {
    let card = MockCard::new().respond(SW_OK).respond(SW_OK);
    let mut session = secure_session(card);

    let certs = [hex!("3003020101").to_vec()];
    session
        .store_certificate_bundle(KeyRef::new(0x13, 0x01), &certs)
        .unwrap();
    assert_eq!(
        session.transport().sent()[1].as_ref(),
        hex!("80E290000E A604 83021301 BF2105 3003020101")
    );
}

#[test]
fn test_get_key_information() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("E00C C00401FF8810 C00413018810 9000"));
    let mut session = clear_session(card);

    let info = session.get_key_information().unwrap();
    assert_eq!(info.len(), 2);
    assert!(info.contains_key(&KeyRef::new(0x01, 0xFF)));
    assert_eq!(info[&KeyRef::new(0x13, 0x01)].get(&0x88), Some(&0x10));
    assert_eq!(session.transport().sent()[1].as_ref(), hex!("80CA00E0"));
}

#[test]
fn test_get_key_information_empty() {
    let card = MockCard::new().respond(SW_OK).respond(hex!("6A88"));
    let mut session = clear_session(card);
    assert!(session.get_key_information().unwrap().is_empty());
}

#[test]
fn test_get_data_follows_response_chain() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("E006C00401 6103"))
        .respond(hex!("FF8810 9000"));
    let mut session = clear_session(card);

    let info = session.get_key_information().unwrap();
    assert!(info.contains_key(&KeyRef::new(0x01, 0xFF)));
    assert_eq!(session.transport().sent()[2].as_ref(), hex!("00C0000003"));
}

#[test]
fn test_get_card_recognition_data() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("660B 7309 06072A864886FC6B01 9000"));
    let mut session = clear_session(card);

    // The 0x66 wrapper is not a 0x73 record
    assert!(session.get_card_recognition_data().is_err());

    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("7309 06072A864886FC6B01 9000"));
    let mut session = clear_session(card);
    assert_eq!(
        session.get_card_recognition_data().unwrap().as_ref(),
        hex!("06072A864886FC6B01")
    );
    assert_eq!(session.transport().sent()[1].as_ref(), hex!("80CA0066"));
}

#[test]
fn test_get_supported_ca_identifiers() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("4203AABBCC 83021003 9000"))
        .respond(hex!("6A88"));
    let mut session = clear_session(card);

    let ids = session.get_supported_ca_identifiers(true, true).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[&KeyRef::new(0x10, 0x03)].as_ref(), hex!("AABBCC"));

    let sent = session.transport().sent();
    assert_eq!(sent[1].as_ref(), hex!("80CAFF33"));
    assert_eq!(sent[2].as_ref(), hex!("80CAFF34"));
}

#[test]
fn test_get_supported_ca_identifiers_requires_selection() {
    let mut session = clear_session(MockCard::new().respond(SW_OK));
    let result = session.get_supported_ca_identifiers(false, false);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(session.transport().sent().len(), 1);
}

#[test]
fn test_get_certificate_bundle() {
    let card = MockCard::new()
        .respond(SW_OK)
        .respond(hex!("3003020101 3003020102 9000"))
        .respond(hex!("6A88"));
    let mut session = clear_session(card);

    let certs = session.get_certificate_bundle(KeyRef::new(0x13, 0x01)).unwrap();
    assert_eq!(certs.len(), 2);
    assert_eq!(certs[1].as_ref(), hex!("3003020102"));
    assert_eq!(
        session.transport().sent()[1].as_ref(),
        hex!("80CABF2106A60483021301")
    );

    let none = session.get_certificate_bundle(KeyRef::new(0x11, 0x01)).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_open_secure_channel_later() {
    let mut session = clear_session(MockCard::new().respond(SW_OK));
    assert!(!session.has_secure_channel());

    session
        .open_secure_channel(Box::new(MockProvider::new()))
        .unwrap();
    assert!(session.has_secure_channel());
    assert!(session.security_level().encryption);
}

#[test]
fn test_close_returns_transport() {
    let card = MockCard::new().respond(SW_OK).respond(SW_OK);
    let mut session = secure_session(card);
    session.delete_key(KeyRef::new(0x13, 0x01), false).unwrap();

    let card = session.close();
    assert_eq!(card.sent().len(), 2);
}
