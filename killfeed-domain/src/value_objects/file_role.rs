// File role value object

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of a server's two tailed files a cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    ServerLog,
    DeathLog,
}

impl FileRole {
    pub const ALL: [FileRole; 2] = [FileRole::ServerLog, FileRole::DeathLog];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::ServerLog => "server_log",
            FileRole::DeathLog => "death_log",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FileRole {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "server_log" | "log" => Ok(FileRole::ServerLog),
            "death_log" | "csv" => Ok(FileRole::DeathLog),
            other => Err(format!("unknown file role '{}'", other)),
        }
    }
}
