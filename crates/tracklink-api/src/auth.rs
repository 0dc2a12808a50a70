use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// How the plain password is encoded before it goes on the wire.
///
/// Most tracking vendors expect the lower-case hex MD5 of the password
/// rather than the password itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordEncoding {
    #[default]
    Md5Hex,
    Plain,
}

impl PasswordEncoding {
    pub fn encode(self, password: &SecretString) -> SecretString {
        match self {
            Self::Md5Hex => {
                let digest = Md5::digest(password.expose_secret().as_bytes());
                SecretString::from(format!("{digest:x}"))
            }
            Self::Plain => password.clone(),
        }
    }
}
