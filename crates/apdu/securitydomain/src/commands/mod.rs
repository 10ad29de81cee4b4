//! Security Domain commands
//!
//! Each command is a typed builder implementing [`ApduCommand`]. Builders
//! validate their arguments and never touch the transport.
//!
//! [`ApduCommand`]: sdtoken_apdu_core::ApduCommand

/// Declare a GlobalPlatform class command with a fixed instruction
macro_rules! gp_command {
    ($(#[$meta:meta])* $name:ident, $ins:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            p1: u8,
            p2: u8,
            data: ::bytes::Bytes,
        }

        impl ::sdtoken_apdu_core::ApduCommand for $name {
            fn class(&self) -> u8 {
                $crate::constants::cla::GP
            }

            fn instruction(&self) -> u8 {
                $ins
            }

            fn p1(&self) -> u8 {
                self.p1
            }

            fn p2(&self) -> u8 {
                self.p2
            }

            fn data(&self) -> Option<&[u8]> {
                (!self.data.is_empty()).then_some(self.data.as_ref())
            }

            fn expected_length(&self) -> Option<::sdtoken_apdu_core::ExpectedLength> {
                None
            }
        }
    };
}

pub mod authenticate;
pub mod delete_key;
pub mod generate_key;
pub mod get_data;
pub mod put_key;
pub mod select;
pub mod store_data;

pub use authenticate::BlockingAttemptCommand;
pub use delete_key::DeleteKeyCommand;
pub use generate_key::GenerateKeyCommand;
pub use get_data::{GetDataCommand, KeyInformation};
pub use put_key::PutKeyCommand;
pub use select::SelectCommand;
pub use store_data::StoreDataCommand;
