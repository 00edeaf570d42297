use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub path: String,
    pub version: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager;

impl ToolManager {
    /// Resolve a tool: an explicit path wins, then common install paths, then PATH.
    pub async fn locate(tool_type: ToolType, configured: Option<&str>) -> ToolInfo {
        let path = match configured {
            Some(p) if !p.trim().is_empty() => p.trim().to_string(),
            _ => Self::find_on_common_paths(tool_type),
        };

        let version = Self::get_version(&path, tool_type).await;
        debug!(tool = tool_type.as_str(), %path, ?version, "tool probe");

        ToolInfo {
            is_available: version.is_some(),
            path,
            version,
        }
    }

    fn find_on_common_paths(tool_type: ToolType) -> String {
        let binary_name = tool_type.as_str();

        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];

        for path in common_paths {
            if Path::new(&path).exists() {
                return path;
            }
        }

        // Last resort: hope it's in PATH
        binary_name.to_string()
    }

    async fn get_version(path: &str, tool_type: ToolType) -> Option<String> {
        match Command::new(path)
            .arg(tool_type.version_arg())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                Some(out.lines().next().unwrap_or("").trim().to_string())
            }
            _ => None,
        }
    }
}
