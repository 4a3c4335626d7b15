use super::rc4::Rc4;
use super::{DecryptionError, DecryptionStatus};
use crate::{Dictionary, Error, Object};
use md5::{Digest as _, Md5};

/// Standard padding string for passwords shorter than 32 bytes.
pub const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// File key length in bytes; only 128-bit keys are supported.
pub const KEY_LENGTH: usize = 16;

/// Inputs of the password algorithms taken from the `/Encrypt` dictionary.
#[derive(Clone, Debug, Default)]
pub struct PasswordAlgorithm {
    pub encrypt_metadata: bool,
    pub version: i64,
    pub revision: i64,
    pub owner_value: Vec<u8>,
    pub user_value: Vec<u8>,
    pub permissions: i32,
}

fn permission_value(object: &Object) -> Result<i32, Error> {
    match *object {
        Object::Integer(value) => i32::try_from(value)
            .or_else(|_| u32::try_from(value).map(|value| value as i32))
            .map_err(|_| Error::NumericRange("P")),
        Object::Real(value) if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 => {
            Ok(value as i32)
        }
        Object::Real(_) => Err(Error::NumericRange("P")),
        _ => Err(DecryptionError::InvalidType.into()),
    }
}

impl TryFrom<&Dictionary> for PasswordAlgorithm {
    type Error = Error;

    fn try_from(encrypted: &Dictionary) -> Result<Self, Self::Error> {
        let encrypt_metadata = match encrypted.find_value(b"EncryptMetadata") {
            Object::Null => true,
            value => value.as_bool().map_err(|_| DecryptionError::InvalidType)?,
        };

        let version = encrypted
            .get(b"V")
            .map_err(|_| DecryptionError::MissingVersion)?
            .as_i64()
            .map_err(|_| DecryptionError::InvalidType)?;

        let revision = encrypted
            .get(b"R")
            .map_err(|_| DecryptionError::MissingRevision)?
            .as_i64()
            .map_err(|_| DecryptionError::InvalidType)?;

        let owner_value = encrypted
            .get(b"O")
            .map_err(|_| DecryptionError::MissingOwnerPassword)?
            .as_str()
            .map_err(|_| DecryptionError::InvalidType)?
            .to_vec();

        let user_value = encrypted
            .get(b"U")
            .map_err(|_| DecryptionError::MissingUserPassword)?
            .as_str()
            .map_err(|_| DecryptionError::InvalidType)?
            .to_vec();

        if owner_value.len() != 32 || user_value.len() != 32 {
            return Err(DecryptionError::InvalidHashLength.into());
        }

        let permissions = permission_value(encrypted.get(b"P").map_err(|_| DecryptionError::MissingPermissions)?)?;

        Ok(Self {
            encrypt_metadata,
            version,
            revision,
            owner_value,
            user_value,
            permissions,
        })
    }
}

/// Convert a password to bytes; only code points up to 255 are representable.
pub fn sanitize_password(password: &str) -> Result<Vec<u8>, DecryptionError> {
    password
        .chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| DecryptionError::PasswordCharacter(c)))
        .collect()
}

/// Pad or truncate a password to exactly 32 bytes.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let len = password.len().min(32);
    let mut padded = [0u8; 32];
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PAD_BYTES[..32 - len]);
    padded
}

/// The 20 RC4 passes keyed by `key XOR i`, for `i` in the given order.
fn rc4_rounds(key: &[u8], data: &mut Vec<u8>, rounds: impl Iterator<Item = u8>) {
    let mut round_key = vec![0u8; key.len()];
    for i in rounds {
        for (in_byte, out_byte) in key.iter().zip(round_key.iter_mut()) {
            *out_byte = in_byte ^ i;
        }
        *data = Rc4::new(&round_key).encrypt(&*data);
    }
}

impl PasswordAlgorithm {
    /// RC4 key protecting `/O`: MD5 of the padded owner password, rehashed 50 times.
    fn owner_key(owner_password: &[u8]) -> Vec<u8> {
        let mut hash = Md5::digest(pad_password(owner_password));
        for _ in 0..50 {
            hash = Md5::digest(hash);
        }
        hash[..KEY_LENGTH].to_vec()
    }

    /// Compute the file encryption key from a (user) password.
    pub fn compute_file_encryption_key(&self, password: &[u8], document_id: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::new();

        hasher.update(pad_password(password));
        hasher.update(&self.owner_value);
        hasher.update(self.permissions.to_le_bytes());
        hasher.update(document_id);
        if self.revision >= 4 && !self.encrypt_metadata {
            hasher.update([0xFF_u8; 4]);
        }

        let mut hash = hasher.finalize();
        for _ in 0..50 {
            hash = Md5::digest(&hash[..KEY_LENGTH]);
        }

        hash[..KEY_LENGTH].to_vec()
    }

    /// Compute the `/O` value for a pair of passwords. An empty owner password falls back to the user password.
    pub fn compute_hashed_owner_password(&self, owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
        let password = if owner_password.is_empty() {
            user_password
        } else {
            owner_password
        };
        let key = Self::owner_key(password);

        let mut result = pad_password(user_password).to_vec();
        rc4_rounds(&key, &mut result, 0..20);
        result
    }

    /// Compute the `/U` value for a user password, zero-filled to 32 bytes.
    pub fn compute_hashed_user_password(&self, user_password: &[u8], document_id: &[u8]) -> Vec<u8> {
        let key = self.compute_file_encryption_key(user_password, document_id);

        let mut hasher = Md5::new();
        hasher.update(PAD_BYTES);
        hasher.update(document_id);

        let mut result = hasher.finalize().to_vec();
        rc4_rounds(&key, &mut result, 0..20);
        result.resize(32, 0);
        result
    }

    /// Check a user password; returns the file encryption key on success.
    pub fn authenticate_user_password(&self, user_password: &[u8], document_id: &[u8]) -> Option<Vec<u8>> {
        let hashed = self.compute_hashed_user_password(user_password, document_id);

        // Only the first 16 bytes are significant for revisions 3 and 4.
        let len = self.user_value.len().min(16);
        if len == 0 || hashed[..len] != self.user_value[..len] {
            return None;
        }

        Some(self.compute_file_encryption_key(user_password, document_id))
    }

    /// Recover the padded user password that `/O` protects with this owner password.
    pub fn recover_user_password(&self, owner_password: &[u8]) -> Vec<u8> {
        let key = Self::owner_key(owner_password);

        let mut result = self.owner_value.clone();
        rc4_rounds(&key, &mut result, (0..20).rev());
        result
    }

    /// Check an owner password; returns the file encryption key on success.
    pub fn authenticate_owner_password(&self, owner_password: &[u8], document_id: &[u8]) -> Option<Vec<u8>> {
        let user_password = self.recover_user_password(owner_password);
        self.authenticate_user_password(&user_password, document_id)
    }

    /// Try the password as owner password, then as user password.
    pub fn test_password(&self, password: &[u8], document_id: &[u8]) -> (DecryptionStatus, Option<Vec<u8>>) {
        if let Some(key) = self.authenticate_owner_password(password, document_id) {
            return (DecryptionStatus::OwnerPassword, Some(key));
        }
        if let Some(key) = self.authenticate_user_password(password, document_id) {
            return (DecryptionStatus::UserPassword, Some(key));
        }
        (DecryptionStatus::InvalidPassword, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    const DOCUMENT_ID: &[u8] = b"\x9D\xDC\x4B\x62\x1B\x3F\x48\x5F\xF5\xED\x0F\x57\xD0\x0A\x02\x8F";

    fn algorithm(revision: i64, owner: &str, user: &str) -> PasswordAlgorithm {
        let mut algorithm = PasswordAlgorithm {
            encrypt_metadata: true,
            version: if revision == 4 { 4 } else { 2 },
            revision,
            permissions: -1852,
            ..Default::default()
        };
        let owner = sanitize_password(owner).unwrap();
        let user = sanitize_password(user).unwrap();
        algorithm.owner_value = algorithm.compute_hashed_owner_password(&owner, &user);
        algorithm.user_value = algorithm.compute_hashed_user_password(&user, DOCUMENT_ID);
        algorithm
    }

    #[test]
    fn authenticate_password_r3() {
        let algorithm = algorithm(3, "owner", "user");

        assert_eq!(algorithm.test_password(b"owner", DOCUMENT_ID).0, DecryptionStatus::OwnerPassword);
        assert_eq!(algorithm.test_password(b"user", DOCUMENT_ID).0, DecryptionStatus::UserPassword);
        assert_eq!(algorithm.test_password(b"wrong", DOCUMENT_ID).0, DecryptionStatus::InvalidPassword);
        assert_eq!(algorithm.test_password(b"", DOCUMENT_ID).0, DecryptionStatus::InvalidPassword);
    }

    #[test]
    fn authenticate_password_r4() {
        let mut algorithm = algorithm(4, "owner", "user");
        assert_eq!(algorithm.test_password(b"owner", DOCUMENT_ID).0, DecryptionStatus::OwnerPassword);
        assert_eq!(algorithm.test_password(b"user", DOCUMENT_ID).0, DecryptionStatus::UserPassword);
        assert_eq!(algorithm.test_password(b"User", DOCUMENT_ID).0, DecryptionStatus::InvalidPassword);

        // Unencrypted metadata changes the file key, so the stored /U no longer matches.
        algorithm.encrypt_metadata = false;
        assert_eq!(algorithm.test_password(b"user", DOCUMENT_ID).0, DecryptionStatus::InvalidPassword);
    }

    #[test]
    fn empty_user_password() {
        let algorithm = algorithm(3, "owner", "");
        let (status, key) = algorithm.test_password(b"", DOCUMENT_ID);
        assert_eq!(status, DecryptionStatus::UserPassword);
        assert_eq!(key.unwrap().len(), KEY_LENGTH);
        assert_eq!(algorithm.test_password(b"owner", DOCUMENT_ID).0, DecryptionStatus::OwnerPassword);
    }

    #[test]
    fn owner_and_user_keys_agree() {
        let algorithm = algorithm(4, "owner", "user");
        let (_, owner_key) = algorithm.test_password(b"owner", DOCUMENT_ID);
        let (_, user_key) = algorithm.test_password(b"user", DOCUMENT_ID);
        assert_eq!(owner_key, user_key);
        assert_eq!(&algorithm.recover_user_password(b"owner")[..], &pad_password(b"user")[..]);
    }

    #[test]
    fn password_padding() {
        assert_eq!(pad_password(b""), PAD_BYTES);
        let padded = pad_password(b"abc");
        assert_eq!(&padded[..3], b"abc");
        assert_eq!(&padded[3..], &PAD_BYTES[..29]);
        let long = [b'x'; 40];
        assert_eq!(pad_password(&long), [b'x'; 32]);
    }

    #[test]
    fn password_characters() {
        assert_eq!(sanitize_password("caf\u{e9}").unwrap(), b"caf\xE9");
        assert!(matches!(
            sanitize_password("\u{20AC}uro"),
            Err(DecryptionError::PasswordCharacter('\u{20AC}'))
        ));
    }

    #[test]
    fn permissions_from_dictionary() {
        let base = dictionary! {
            "V" => 2,
            "R" => 3,
            "O" => Object::string_literal(vec![0u8; 32]),
            "U" => Object::string_literal(vec![0u8; 32]),
        };

        let mut dict = base.clone();
        dict.set("P", 4294963392u32);
        assert_eq!(PasswordAlgorithm::try_from(&dict).unwrap().permissions, -3904);

        let mut dict = base.clone();
        dict.set("P", -3904.0);
        assert_eq!(PasswordAlgorithm::try_from(&dict).unwrap().permissions, -3904);

        let mut dict = base.clone();
        dict.set("P", -3904.5);
        assert!(matches!(PasswordAlgorithm::try_from(&dict), Err(Error::NumericRange("P"))));

        let mut dict = base;
        dict.set("P", 1e12);
        assert!(matches!(PasswordAlgorithm::try_from(&dict), Err(Error::NumericRange("P"))));
    }
}
