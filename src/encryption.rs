mod algorithms;
pub mod crypt_filters;
mod rc4;

use crate::{Dictionary, Error, Object, ObjectId};
use bitflags::bitflags;
use crypt_filters::*;
use log::warn;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use algorithms::{PAD_BYTES, PasswordAlgorithm, pad_password, sanitize_password};
pub use rc4::Rc4;

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("missing the encryption version (/V)")]
    MissingVersion,
    #[error("missing encryption revision")]
    MissingRevision,
    #[error("missing the owner password (/O)")]
    MissingOwnerPassword,
    #[error("missing the user password (/U)")]
    MissingUserPassword,
    #[error("missing the permissions field (/P)")]
    MissingPermissions,
    #[error("missing the file /ID elements")]
    MissingFileID,

    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid ciphertext length")]
    InvalidCipherTextLength,
    #[error("invalid hash length")]
    InvalidHashLength,
    #[error("unexpected type in the encryption dictionary")]
    InvalidType,
    #[error("invalid padding")]
    Padding,
    #[error("password character {0:?} is outside Latin-1")]
    PasswordCharacter(char),

    #[error("the security handler /{0} is not supported")]
    UnsupportedSecurityHandler(String),
    #[error("encryption V={version} R={revision} is not supported")]
    UnsupportedEncryption { version: i64, revision: i64 },
    #[error("the crypt filter /{0} is not supported")]
    UnsupportedCryptFilter(String),
}

/// Outcome of opening a document with a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionStatus {
    FileNotProtected,
    OwnerPassword,
    UserPassword,
    InvalidPassword,
    Unsupported,
}

impl fmt::Display for DecryptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecryptionStatus::FileNotProtected => "file not protected",
            DecryptionStatus::OwnerPassword => "owner password",
            DecryptionStatus::UserPassword => "user password",
            DecryptionStatus::InvalidPassword => "invalid password",
            DecryptionStatus::Unsupported => "unsupported encryption",
        };
        f.write_str(text)
    }
}

bitflags! {
    /// Access permissions from the `/P` entry. Bit numbers in ISO 32000 are one-based.
    #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct Permissions: u32 {
        /// Print the document, possibly at reduced quality unless
        /// [`Permissions::PRINTABLE_IN_HIGH_QUALITY`] is also set.
        const PRINTABLE = 1 << 2;

        /// Modify the contents by operations other than those controlled by
        /// [`Permissions::ANNOTABLE`], [`Permissions::FILLABLE`] and [`Permissions::ASSEMBLABLE`].
        const MODIFIABLE = 1 << 3;

        /// Copy or otherwise extract text and graphics.
        const COPYABLE = 1 << 4;

        /// Add or modify text annotations and fill in form fields.
        const ANNOTABLE = 1 << 5;

        /// Fill in existing form fields, even if [`Permissions::ANNOTABLE`] is clear.
        const FILLABLE = 1 << 8;

        /// Extract text and graphics for accessibility.
        const COPYABLE_FOR_ACCESSIBILITY = 1 << 9;

        /// Insert, rotate or delete pages and create outline items or thumbnails.
        const ASSEMBLABLE = 1 << 10;

        /// Print at full quality.
        const PRINTABLE_IN_HIGH_QUALITY = 1 << 11;
    }
}

impl Permissions {
    /// Reserved bits that are set in every conforming `/P` value.
    pub const RESERVED: u32 = 0xFFFF_F0C0;

    /// The `/P` value for these permissions.
    pub fn p_value(&self) -> i32 {
        (self.bits() | Self::RESERVED) as i32
    }
}

/// Key material and crypt filters for one opened document.
#[derive(Clone, Debug)]
pub struct SecurityHandler {
    status: DecryptionStatus,
    permissions: Permissions,
    document_id: Vec<u8>,
    file_encryption_key: Vec<u8>,
    string_filter: Arc<dyn CryptFilter>,
    stream_filter: Arc<dyn CryptFilter>,
}

/// Crypt filter named by `/StmF` or `/StrF` of a V4 dictionary.
fn v4_filter(encrypted: &Dictionary, key: &[u8]) -> Result<Arc<dyn CryptFilter>, DecryptionError> {
    let name = match encrypted.find_value(key) {
        Object::Null => return Ok(Arc::new(IdentityCryptFilter)),
        value => value.as_name().map_err(|_| DecryptionError::InvalidType)?,
    };
    if name == b"Identity" {
        return Ok(Arc::new(IdentityCryptFilter));
    }

    let unsupported = || DecryptionError::UnsupportedCryptFilter(String::from_utf8_lossy(name).into_owned());
    let filter = encrypted
        .find_value(b"CF")
        .as_dict()
        .ok()
        .map(|filters| filters.find_value(name))
        .and_then(|filter| filter.as_dict().ok())
        .ok_or_else(unsupported)?;

    if filter.find_value(b"CFM").as_name().ok() != Some(&b"AESV2"[..]) {
        return Err(unsupported());
    }
    match filter.find_value(b"Length") {
        Object::Null | Object::Integer(16) | Object::Integer(128) => {}
        _ => return Err(DecryptionError::InvalidKeyLength),
    }
    match filter.find_value(b"AuthEvent") {
        Object::Null => {}
        value if value.as_name().ok() == Some(&b"DocOpen"[..]) => {}
        _ => return Err(unsupported()),
    }

    Ok(Arc::new(Aes128CryptFilter))
}

impl SecurityHandler {
    /// Authenticate `password` against the standard security handler described by `encrypted`.
    ///
    /// A wrong password or an unsupported configuration fails with [`Error::Protected`].
    pub fn new(encrypted: &Dictionary, document_id: &[u8], password: &str) -> Result<Self, Error> {
        let filter = encrypted.find_value(b"Filter").as_name().unwrap_or(&b"Standard"[..]);
        if filter != b"Standard" {
            warn!(
                "{}",
                DecryptionError::UnsupportedSecurityHandler(String::from_utf8_lossy(filter).into_owned())
            );
            return Err(Error::Protected(DecryptionStatus::Unsupported));
        }

        let version = encrypted.find_value(b"V").as_i64().unwrap_or(0);
        let revision = encrypted.find_value(b"R").as_i64().unwrap_or(0);
        if !matches!((revision, version), (3, 2) | (4, 4)) {
            warn!("{}", DecryptionError::UnsupportedEncryption { version, revision });
            return Err(Error::Protected(DecryptionStatus::Unsupported));
        }

        let algorithm = PasswordAlgorithm::try_from(encrypted)?;
        let (string_filter, stream_filter) = match Self::crypt_filters(encrypted, &algorithm) {
            Ok(filters) => filters,
            Err(err) => {
                warn!("{}", err);
                return Err(Error::Protected(DecryptionStatus::Unsupported));
            }
        };

        let password = match sanitize_password(password) {
            Ok(password) => password,
            Err(err) => {
                warn!("{}", err);
                return Err(Error::Protected(DecryptionStatus::InvalidPassword));
            }
        };

        let (status, key) = algorithm.test_password(&password, document_id);
        let Some(file_encryption_key) = key else {
            return Err(Error::Protected(status));
        };

        Ok(SecurityHandler {
            status,
            permissions: Permissions::from_bits_retain(algorithm.permissions as u32),
            document_id: document_id.to_vec(),
            file_encryption_key,
            string_filter,
            stream_filter,
        })
    }

    /// Supported configurations: R3/V2 with 128-bit RC4 and R4/V4 with AESV2.
    fn crypt_filters(
        encrypted: &Dictionary, algorithm: &PasswordAlgorithm,
    ) -> Result<(Arc<dyn CryptFilter>, Arc<dyn CryptFilter>), DecryptionError> {
        let length = encrypted.find_value(b"Length");
        match (algorithm.revision, algorithm.version) {
            (3, 2) => {
                if length.as_i64().ok() != Some(128) {
                    return Err(DecryptionError::InvalidKeyLength);
                }
                Ok((Arc::new(Rc4CryptFilter), Arc::new(Rc4CryptFilter)))
            }
            (4, 4) => {
                if !length.is_null() && length.as_i64().ok() != Some(128) {
                    return Err(DecryptionError::InvalidKeyLength);
                }
                Ok((v4_filter(encrypted, b"StrF")?, v4_filter(encrypted, b"StmF")?))
            }
            (revision, version) => Err(DecryptionError::UnsupportedEncryption { version, revision }),
        }
    }

    pub fn status(&self) -> DecryptionStatus {
        self.status
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn document_id(&self) -> &[u8] {
        &self.document_id
    }

    pub fn file_encryption_key(&self) -> &[u8] {
        &self.file_encryption_key
    }

    pub fn decrypt_string(&self, id: ObjectId, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let key = self.string_filter.compute_key(&self.file_encryption_key, id)?;
        self.string_filter.decrypt(&key, ciphertext)
    }

    pub fn decrypt_stream(&self, id: ObjectId, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let key = self.stream_filter.compute_key(&self.file_encryption_key, id)?;
        self.stream_filter.decrypt(&key, ciphertext)
    }

    /// Decrypt every string inside `object` in place.
    ///
    /// A string that fails to decrypt is left as it was.
    pub fn decrypt_strings(&self, id: ObjectId, object: &mut Object) {
        let key = match self.string_filter.compute_key(&self.file_encryption_key, id) {
            Ok(key) => key,
            Err(err) => {
                warn!("cannot derive key for object {} {}: {}", id.0, id.1, err);
                return;
            }
        };
        self.decrypt_with_key(id, &key, object);
    }

    fn decrypt_with_key(&self, id: ObjectId, key: &[u8], object: &mut Object) {
        match object {
            Object::Array(objects) => {
                for object in objects {
                    self.decrypt_with_key(id, key, object);
                }
            }
            Object::Dictionary(dict) => {
                for (_, object) in dict.iter_mut() {
                    self.decrypt_with_key(id, key, object);
                }
            }
            Object::String(content, _) => match self.string_filter.decrypt(key, content) {
                Ok(plaintext) => *content = plaintext,
                Err(err) => warn!("string in object {} {} left encrypted: {}", id.0, id.1, err),
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StringFormat, dictionary};

    const DOCUMENT_ID: &[u8] = b"0123456789ABCDEF";

    fn encrypt_dict(revision: i64, owner: &str, user: &str) -> Dictionary {
        let mut algorithm = PasswordAlgorithm {
            encrypt_metadata: true,
            version: if revision == 4 { 4 } else { 2 },
            revision,
            permissions: Permissions::PRINTABLE.p_value(),
            ..Default::default()
        };
        algorithm.owner_value = algorithm.compute_hashed_owner_password(owner.as_bytes(), user.as_bytes());
        algorithm.user_value = algorithm.compute_hashed_user_password(user.as_bytes(), DOCUMENT_ID);

        let mut dict = dictionary! {
            "Filter" => "Standard",
            "V" => algorithm.version,
            "R" => revision,
            "Length" => 128,
            "O" => Object::String(algorithm.owner_value.clone(), StringFormat::Hexadecimal),
            "U" => Object::String(algorithm.user_value.clone(), StringFormat::Hexadecimal),
            "P" => algorithm.permissions,
        };
        if revision == 4 {
            dict.set(
                "CF",
                dictionary! {
                    "StdCF" => dictionary! {
                        "CFM" => "AESV2",
                        "Length" => 16,
                        "AuthEvent" => "DocOpen",
                    },
                },
            );
            dict.set("StmF", "StdCF");
            dict.set("StrF", "StdCF");
        }
        dict
    }

    #[test]
    fn opens_with_owner_and_user_passwords() {
        for revision in [3, 4] {
            let dict = encrypt_dict(revision, "secret", "reader");
            let owner = SecurityHandler::new(&dict, DOCUMENT_ID, "secret").unwrap();
            assert_eq!(owner.status(), DecryptionStatus::OwnerPassword);
            let user = SecurityHandler::new(&dict, DOCUMENT_ID, "reader").unwrap();
            assert_eq!(user.status(), DecryptionStatus::UserPassword);
            assert_eq!(owner.file_encryption_key(), user.file_encryption_key());
            assert!(user.permissions().contains(Permissions::PRINTABLE));
            assert!(!user.permissions().contains(Permissions::COPYABLE));

            let wrong = SecurityHandler::new(&dict, DOCUMENT_ID, "guess").unwrap_err();
            assert_eq!(wrong.status(), Some(DecryptionStatus::InvalidPassword));
        }
    }

    #[test]
    fn rejects_unsupported_configurations() {
        let mut dict = encrypt_dict(3, "secret", "");
        dict.set("Length", 40);
        let err = SecurityHandler::new(&dict, DOCUMENT_ID, "").unwrap_err();
        assert_eq!(err.status(), Some(DecryptionStatus::Unsupported));

        let mut dict = encrypt_dict(3, "secret", "");
        dict.set("R", 6);
        dict.set("V", 5);
        let err = SecurityHandler::new(&dict, DOCUMENT_ID, "").unwrap_err();
        assert_eq!(err.status(), Some(DecryptionStatus::Unsupported));

        let mut dict = encrypt_dict(4, "secret", "");
        dict.set("CF", dictionary! { "StdCF" => dictionary! { "CFM" => "V2" } });
        let err = SecurityHandler::new(&dict, DOCUMENT_ID, "").unwrap_err();
        assert_eq!(err.status(), Some(DecryptionStatus::Unsupported));

        let mut dict = encrypt_dict(3, "secret", "");
        dict.set("Filter", "Custom");
        let err = SecurityHandler::new(&dict, DOCUMENT_ID, "").unwrap_err();
        assert_eq!(err.status(), Some(DecryptionStatus::Unsupported));
    }

    #[test]
    fn non_latin1_password_is_invalid() {
        let dict = encrypt_dict(3, "secret", "");
        let err = SecurityHandler::new(&dict, DOCUMENT_ID, "\u{3042}").unwrap_err();
        assert_eq!(err.status(), Some(DecryptionStatus::InvalidPassword));
    }

    #[test]
    fn decrypts_nested_strings() {
        let dict = encrypt_dict(4, "secret", "");
        let handler = SecurityHandler::new(&dict, DOCUMENT_ID, "").unwrap();
        let id = (7, 0);
        let key = Aes128CryptFilter.compute_key(handler.file_encryption_key(), id).unwrap();
        let encrypted = Aes128CryptFilter.encrypt(&key, b"Title").unwrap();

        let mut object = Object::Dictionary(dictionary! {
            "Title" => Object::String(encrypted, StringFormat::Literal),
            "Broken" => Object::String(vec![1, 2, 3], StringFormat::Literal),
            "Kids" => vec![Object::Integer(1)],
        });
        handler.decrypt_strings(id, &mut object);

        let dict = object.as_dict().unwrap();
        assert_eq!(dict.get(b"Title").unwrap().as_str().unwrap(), b"Title");
        // Invalid ciphertext is kept.
        assert_eq!(dict.get(b"Broken").unwrap().as_str().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn p_value_sets_reserved_bits() {
        assert_eq!(Permissions::empty().p_value(), -3904);
        assert_eq!(Permissions::all().p_value(), -4);
    }
}
