#![forbid(unsafe_code)]

mod lifecycle;
mod state;

pub(crate) use state::{SidebarState, TreeSnapshot, ViewMode};

#[cfg(test)]
mod tests;
