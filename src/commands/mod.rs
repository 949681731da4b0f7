//! Commands that mutate a draw.
//!
//! Each command is a serializable value so a sequence of them can be stored
//! and replayed against a snapshot.
//!
//! # Example
//!
//! ```
//! use draw_engine::commands::Command;
//!
//! let json = r#"{"command": "ASSIGN_BYE", "structureId": "main", "drawPosition": 7}"#;
//! let cmd: Command = serde_json::from_str(json).unwrap();
//! assert_eq!(cmd.name(), "assign_bye");
//! ```

mod types;

pub use types::Command;
