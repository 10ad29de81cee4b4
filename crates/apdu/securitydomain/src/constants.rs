//! Constants used by the Security Domain
//!
//! Class bytes, instruction codes, parameter values, data object tags and key
//! identifiers defined by GlobalPlatform Card Specification v2.3 and its
//! Amendments D (SCP03) and F (SCP11).

/// Command classes
pub mod cla {
    /// ISO7816 command class
    pub const ISO7816: u8 = 0x00;
    /// GlobalPlatform command class
    pub const GP: u8 = 0x80;
}

/// Instruction codes
pub mod ins {
    /// SELECT command
    pub const SELECT: u8 = 0xA4;
    /// GET DATA command
    pub const GET_DATA: u8 = 0xCA;
    /// PUT KEY command
    pub const PUT_KEY: u8 = 0xD8;
    /// GENERATE KEY command
    pub const GENERATE_KEY: u8 = 0xF1;
    /// DELETE command
    pub const DELETE: u8 = 0xE4;
    /// STORE DATA command
    pub const STORE_DATA: u8 = 0xE2;
    /// INITIALIZE UPDATE command
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE command
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// INTERNAL AUTHENTICATE command
    pub const INTERNAL_AUTHENTICATE: u8 = 0x88;
    /// PERFORM SECURITY OPERATION command
    pub const PERFORM_SECURITY_OPERATION: u8 = 0x2A;
}

/// Parameter values for SELECT command (P1)
pub mod select_p1 {
    /// Select by DF name
    pub const BY_NAME: u8 = 0x04;
}

/// Parameter values for PUT KEY command (P2)
pub mod put_key_p2 {
    /// Multiple keys in the data field
    pub const MULTIPLE_KEYS: u8 = 0x80;
}

/// Parameter values for STORE DATA command (P1)
pub mod store_data_p1 {
    /// Last block, BER-TLV formatted, no additional encryption information
    pub const LAST_BLOCK_BER_TLV: u8 = 0x90;
}

/// Key type tags used in PUT KEY and GENERATE KEY data fields
pub mod key_type {
    /// AES key
    pub const AES: u16 = 0x88;
    /// EC public key
    pub const ECC_PUBLIC_KEY: u16 = 0xB0;
    /// EC private key
    pub const ECC_PRIVATE_KEY: u16 = 0xB1;
    /// EC key parameters reference
    pub const ECC_KEY_PARAMS: u16 = 0xF0;
}

/// Tags for data objects and their content
pub mod tags {
    /// Key information data object
    pub const KEY_INFORMATION: u16 = 0xE0;
    /// Key information template
    pub const KEY_INFORMATION_TEMPLATE: u16 = 0xC0;
    /// Card recognition data object
    pub const CARD_RECOGNITION_DATA: u16 = 0x66;
    /// Card data
    pub const CARD_DATA: u16 = 0x73;
    /// CA key identifiers, key loading OCE certificates
    pub const CA_KLOC_IDENTIFIERS: u16 = 0xFF33;
    /// CA key identifiers, key loading card certificates
    pub const CA_KLCC_IDENTIFIERS: u16 = 0xFF34;
    /// Certificate store
    pub const CERTIFICATE_STORE: u16 = 0xBF21;
    /// Control reference template
    pub const CONTROL_REFERENCE: u16 = 0xA6;
    /// Key identifier (kid, kvn)
    pub const KEY_ID: u16 = 0x83;
    /// Subject key identifier
    pub const SUBJECT_KEY_ID: u16 = 0x42;
    /// KLCC flag inside a CA issuer control reference
    pub const KLCC_FLAG: u16 = 0x80;
    /// Serial number allow list
    pub const ALLOWLIST: u16 = 0x70;
    /// Certificate serial number
    pub const SERIAL: u16 = 0x93;
    /// DELETE filter: key identifier
    pub const DELETE_KEY_ID: u16 = 0xD0;
    /// DELETE filter: key version number
    pub const DELETE_KEY_VERSION: u16 = 0xD2;
}

/// Well known key identifiers (KID)
pub mod kid {
    /// SCP03 static key set
    pub const SCP03: u8 = 0x01;
    /// First alternate SCP03 key identifier
    pub const SCP03_ALTERNATE_1: u8 = 0x02;
    /// Second alternate SCP03 key identifier
    pub const SCP03_ALTERNATE_2: u8 = 0x03;
    /// OCE CA public key
    pub const OCE: u8 = 0x10;
    /// SCP11a key pair
    pub const SCP11A: u8 = 0x11;
    /// SCP11b key pair
    pub const SCP11B: u8 = 0x13;
    /// SCP11c key pair
    pub const SCP11C: u8 = 0x15;
    /// First key identifier of the OCE CA range
    pub const OCE_CA_FIRST: u8 = 0x20;
    /// Last key identifier of the OCE CA range
    pub const OCE_CA_LAST: u8 = 0x2F;
}

/// Issuer Security Domain AID
pub const SECURITY_DOMAIN_AID: [u8; 8] = [0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00];

/// EC key parameters reference value for NIST P-256
pub const EC_PARAMS_P256: u8 = 0x00;

/// Default number of failed authentications sent per key during reset
pub const DEFAULT_BLOCK_ATTEMPTS: usize = 65;

/// Payload of a deliberately invalid authentication attempt
pub const INVALID_AUTH_PAYLOAD: [u8; 8] = [0x00; 8];
