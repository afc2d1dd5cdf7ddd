//! Message body encoding.
//!
//! Bodies are stored encoded and every message also carries a short
//! cleartext preview for list views. The default [`ReversibleEncoding`] is an
//! obfuscation placeholder, NOT encryption: anyone holding the conversation
//! id (and the server secret) can read the body. Swapping in real
//! per-recipient encryption means implementing [`MessageCipher`] together
//! with key distribution, which this crate does not provide.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use agora_shared::constants::PREVIEW_LENGTH;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("decoded body is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Symmetric, deterministic transform for a given context (the
/// conversation id).
pub trait MessageCipher: Send + Sync {
    fn encode(&self, context: &str, plaintext: &str) -> String;

    fn decode(&self, context: &str, ciphertext: &str) -> Result<String, CipherError>;
}

/// XOR with a keystream derived from the context and a server secret,
/// then base64.
#[derive(Debug, Clone, Default)]
pub struct ReversibleEncoding {
    secret: String,
}

impl ReversibleEncoding {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn keystream(&self, context: &str) -> Vec<u8> {
        let mut key: Vec<u8> = self.secret.bytes().chain(context.bytes()).collect();
        if key.is_empty() {
            key.push(0x5a);
        }
        // FNV-style diffusion so similar contexts do not share a stream.
        let mut state: u32 = 0x811c_9dc5;
        for byte in key.iter_mut() {
            state = (state ^ u32::from(*byte)).wrapping_mul(0x0100_0193);
            *byte = (state >> 8) as u8;
        }
        key
    }

    fn apply(&self, context: &str, data: &mut [u8]) {
        let key = self.keystream(context);
        for (i, byte) in data.iter_mut().enumerate() {
            *byte ^= key[i % key.len()];
        }
    }
}

impl MessageCipher for ReversibleEncoding {
    fn encode(&self, context: &str, plaintext: &str) -> String {
        let mut bytes = plaintext.as_bytes().to_vec();
        self.apply(context, &mut bytes);
        STANDARD.encode(bytes)
    }

    fn decode(&self, context: &str, ciphertext: &str) -> Result<String, CipherError> {
        let mut bytes = STANDARD.decode(ciphertext)?;
        self.apply(context, &mut bytes);
        Ok(String::from_utf8(bytes)?)
    }
}

/// Cleartext excerpt stored next to the body: the first `PREVIEW_LENGTH`
/// characters, never splitting a character.
pub fn preview_of(plaintext: &str) -> String {
    match plaintext.char_indices().nth(PREVIEW_LENGTH) {
        Some((end, _)) => plaintext[..end].to_string(),
        None => plaintext.to_string(),
    }
}
