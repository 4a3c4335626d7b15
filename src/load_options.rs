/// Smallest file accepted as a PDF document.
pub const MIN_FILE_SIZE: u64 = 32;

/// Default upper bound on the file size, 1 GiB.
pub const MAX_FILE_SIZE: u64 = 0x4000_0000;

/// Options for loading PDF documents
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Password tried as owner password first, then as user password.
    pub password: Option<String>,

    /// Files larger than this are rejected before parsing.
    pub max_file_size: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            password: None,
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl LoadOptions {
    /// Create a builder for LoadOptions
    pub fn builder() -> LoadOptionsBuilder {
        LoadOptionsBuilder::default()
    }

    /// Effective size limit. Files over 1 GiB are rejected whatever `max_file_size` says.
    pub fn file_size_limit(&self) -> u64 {
        self.max_file_size.min(MAX_FILE_SIZE)
    }

    /// The password to try, empty when none was given.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }
}

/// Builder for LoadOptions
#[derive(Default)]
pub struct LoadOptionsBuilder {
    password: Option<String>,
    max_file_size: Option<u64>,
}

impl LoadOptionsBuilder {
    pub fn password<S: Into<String>>(mut self, value: S) -> Self {
        self.password = Some(value.into());
        self
    }

    /// Set the size limit; values above 1 GiB are clamped.
    pub fn max_file_size(mut self, value: u64) -> Self {
        self.max_file_size = Some(value);
        self
    }

    pub fn build(self) -> LoadOptions {
        LoadOptions {
            password: self.password,
            max_file_size: self.max_file_size.map_or(MAX_FILE_SIZE, |size| size.min(MAX_FILE_SIZE)),
        }
    }
}
