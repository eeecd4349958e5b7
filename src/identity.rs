//! Record identity fields and independent id generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Field holding the store-assigned identity.
pub const NATIVE_ID_FIELD: &str = "_id";

/// Field holding the service-generated identity.
pub const INDEPENDENT_ID_FIELD: &str = "id";

/// Length of every string produced by [`generate_id`].
pub const INDEPENDENT_ID_LEN: usize = 43;

/// Generate a store-independent identifier: 256 random bits, URL-safe base64
/// without padding.
///
/// The length differs from a hex ObjectId (24), so an independent id is never
/// mistaken for a native one during query normalization.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
