use super::DecryptionError;
use super::rc4::Rc4;
use crate::ObjectId;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest as _, Md5};
use rand::RngExt as _;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Salt appended to the object key input for AES filters.
const AES_SALT: &[u8; 4] = b"sAlT";

pub trait CryptFilter: std::fmt::Debug + Send + Sync {
    fn compute_key(&self, key: &[u8], obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError>;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
}

/// Key for one object: MD5 over the file key, the low three bytes of the object number, the
/// low two bytes of the generation and an optional salt, cut to `n + 5` bytes (at most 16).
fn object_key(key: &[u8], obj_id: ObjectId, salt: Option<&[u8]>) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(key);
    hasher.update(&obj_id.0.to_le_bytes()[..3]);
    hasher.update(&obj_id.1.to_le_bytes()[..2]);
    if let Some(salt) = salt {
        hasher.update(salt);
    }

    let key_len = std::cmp::min(key.len() + 5, 16);
    hasher.finalize()[..key_len].to_vec()
}

#[derive(Clone, Copy, Debug)]
pub struct IdentityCryptFilter;

impl CryptFilter for IdentityCryptFilter {
    fn compute_key(&self, key: &[u8], _obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        Ok(key.to_vec())
    }

    fn encrypt(&self, _key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, _key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(ciphertext.to_vec())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Rc4CryptFilter;

impl CryptFilter for Rc4CryptFilter {
    fn compute_key(&self, key: &[u8], obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        if key.is_empty() {
            return Err(DecryptionError::InvalidKeyLength);
        }
        Ok(object_key(key, obj_id, None))
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        self.decrypt(key, plaintext)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if key.is_empty() || key.len() > 256 {
            return Err(DecryptionError::InvalidKeyLength);
        }
        Ok(Rc4::new(key).decrypt(ciphertext))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Aes128CryptFilter;

impl Aes128CryptFilter {
    /// Encrypt with a caller-chosen IV, which is written in front of the ciphertext.
    pub fn encrypt_with_iv(&self, key: &[u8], iv: &[u8; 16], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if key.len() != 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        // Room for the IV and a full padding block.
        let ciphertext_len = (plaintext.len() + 16) / 16 * 16;
        let mut ciphertext = Vec::with_capacity(16 + ciphertext_len);
        ciphertext.extend_from_slice(iv);
        ciphertext.extend_from_slice(plaintext);
        ciphertext.resize(16 + ciphertext_len, 0);

        Aes128CbcEnc::new(key.into(), &(*iv).into())
            .encrypt_padded_mut::<Pkcs7>(&mut ciphertext[16..], plaintext.len())
            .map_err(|_| DecryptionError::Padding)?;

        Ok(ciphertext)
    }
}

impl CryptFilter for Aes128CryptFilter {
    fn compute_key(&self, key: &[u8], obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        Ok(object_key(key, obj_id, Some(AES_SALT)))
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let mut rng = rand::rng();
        let mut iv = [0u8; 16];
        rng.fill(&mut iv);

        self.encrypt_with_iv(key, &iv, plaintext)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if key.len() != 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        if ciphertext.len() % 16 != 0 {
            return Err(DecryptionError::InvalidCipherTextLength);
        }

        // Nothing follows the IV.
        if ciphertext.len() <= 16 {
            return Ok(vec![]);
        }

        let mut iv = [0x00u8; 16];
        iv.copy_from_slice(&ciphertext[..16]);

        let data = &mut ciphertext[16..].to_vec();

        Ok(Aes128CbcDec::new(key.into(), &iv.into())
            .decrypt_padded_mut::<Pkcs7>(data)
            .map_err(|_| DecryptionError::Padding)?
            .to_vec())
    }
}
