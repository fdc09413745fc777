//! VM authentication selection

use crate::schema::{Inputs, Sensitive};

/// How administrators log in to every VM of the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Key-based login; password authentication disabled
    SshKey { public_key: String },
    /// Password login; the password may be missing and is then rejected at apply
    Password { password: Option<Sensitive> },
}

impl AuthMode {
    /// Select the mode from the inputs
    ///
    /// A supplied SSH key always wins, whatever the password says.
    pub fn select(inputs: &Inputs) -> Self {
        match &inputs.ssh_public_key {
            Some(key) => Self::SshKey {
                public_key: key.clone(),
            },
            None => Self::Password {
                password: inputs.admin_password.clone(),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SshKey { .. } => "SSH Key",
            Self::Password { .. } => "Password",
        }
    }

    pub fn is_ssh_key(&self) -> bool {
        matches!(self, Self::SshKey { .. })
    }

    /// Value of `disable_password_authentication`
    pub fn password_disabled(&self) -> bool {
        self.is_ssh_key()
    }
}
