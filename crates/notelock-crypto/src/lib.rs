//! Notelock Cryptographic Primitives
//!
//! Cryptographic building blocks for the notelock key-synchronization
//! protocol. Pure functions with deterministic outputs. Callers provide RNGs
//! for deterministic testing.
//!
//! # Key Lifecycle
//!
//! Each device owns a long-lived RSA-OAEP key pair. The account owns a single
//! AES-256-GCM note key, created once by the seed device. The note key never
//! leaves a device unprotected: it travels only wrapped under a recipient
//! device's public key.
//!
//! ```text
//! Device Key Pair (RSA-OAEP, per device)
//!        │
//!        ▼
//! Wrap/Unwrap → Note Key (AES-256-GCM, per account)
//!        │
//!        ▼
//! Note Cipher → Ciphertext Blob (Base64 IV ‖ Base64 ciphertext)
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - The backend only ever sees SPKI public keys, wrapped note keys, and
//!   note ciphertexts
//! - RSA-OAEP with SHA-256 on both wrap and unwrap sides
//!
//! Authenticity:
//! - AES-GCM authenticates every note blob; a failed tag surfaces as
//!   [`CryptoError::IntegrityCheckFailed`], never as garbage plaintext
//!
//! IV discipline:
//! - Every encryption draws a fresh 12-byte IV from the caller's RNG; the IV
//!   is carried in the blob, so no counter state is shared between devices

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod keypair;
mod note_cipher;
mod symmetric;

pub use error::CryptoError;
pub use keypair::{DeviceKeyPair, MIN_RSA_BITS, export_public_key, import_public_key};
pub use note_cipher::{IV_BASE64_LEN, IV_SIZE, decrypt_note, encrypt_note};
pub use symmetric::{NOTE_KEY_SIZE, NoteKey, unwrap_note_key, wrap_note_key};

// Re-exported so consumers name the same key types this crate operates on.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
