use crate::core::types::CsrfState;

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for CsrfState {
    fn from_random() -> Self {
        CsrfState(random_string(32))
    }
}

/// `size` bytes from the thread RNG, base64url encoded without padding.
fn random_string(size: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::RngCore;

    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
