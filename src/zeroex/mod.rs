pub mod exchange;
pub mod order;
pub mod signature;

pub use exchange::{ZxExchange, ZxOrderInfo, ZxOrderStatus};
pub use order::{ZxOrderJson, ZxSignedOrder};
pub use signature::{parse_zx_signature, sign_hash_zx_compat, sign_personal_message, zx_signature_from_ec};
