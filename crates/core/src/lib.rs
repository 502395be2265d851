#![forbid(unsafe_code)]

pub mod merge;
pub mod state;
pub mod tree;

pub mod ids {
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct WorkspaceId(String);

    impl WorkspaceId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, WorkspaceIdError> {
            let value = value.into();
            validate_workspace_id(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum WorkspaceIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl WorkspaceIdError {
        pub fn message(&self) -> String {
            match self {
                Self::Empty => "workspace id must not be empty".to_string(),
                Self::TooLong => "workspace id is too long".to_string(),
                Self::InvalidFirstChar => {
                    "workspace id must start with an ascii letter or digit".to_string()
                }
                Self::InvalidChar { ch, index } => {
                    format!("workspace id contains invalid char {ch:?} at index {index}")
                }
            }
        }
    }

    fn validate_workspace_id(value: &str) -> Result<(), WorkspaceIdError> {
        if value.is_empty() {
            return Err(WorkspaceIdError::Empty);
        }
        if value.len() > 128 {
            return Err(WorkspaceIdError::TooLong);
        }
        let mut chars = value.chars().enumerate();
        let Some((_, first)) = chars.next() else {
            return Err(WorkspaceIdError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(WorkspaceIdError::InvalidFirstChar);
        }
        for (index, ch) in chars {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                continue;
            }
            return Err(WorkspaceIdError::InvalidChar { ch, index });
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn workspace_id_validation() {
            assert_eq!(
                WorkspaceId::try_new("").unwrap_err(),
                WorkspaceIdError::Empty
            );
            assert_eq!(
                WorkspaceId::try_new("-lead").unwrap_err(),
                WorkspaceIdError::InvalidFirstChar
            );
            assert_eq!(
                WorkspaceId::try_new("has space").unwrap_err(),
                WorkspaceIdError::InvalidChar { ch: ' ', index: 3 }
            );
            assert_eq!(
                WorkspaceId::try_new("a".repeat(129)).unwrap_err(),
                WorkspaceIdError::TooLong
            );
            assert!(WorkspaceId::try_new("notes.2024_main-1").is_ok());
        }
    }
}

pub mod model {
    /// Page a referencing block lives on, when the block is not orphaned.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ContainingPage {
        pub uid: String,
        pub title: String,
    }

    /// One block whose text tag-marks a page.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct BlockRef {
        pub block_uid: String,
        pub text: Option<String>,
        pub page: Option<ContainingPage>,
    }

    impl BlockRef {
        /// Grouping key for merged listings: the containing page title when
        /// the block lives on a page, otherwise the block uid itself.
        pub fn group_key(&self) -> &str {
            match &self.page {
                Some(page) => page.title.as_str(),
                None => self.block_uid.as_str(),
            }
        }
    }

    /// A referenced page plus every block that tag-marked it.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct PageRefs {
        pub page_uid: String,
        pub title: String,
        pub refs: Vec<BlockRef>,
    }
}
