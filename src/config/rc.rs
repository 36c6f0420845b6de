use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct RcConfig {
    pub data_dir: Option<PathBuf>,
    pub keep_backups: Option<usize>,
}

impl RcConfig {
    /// Load configuration from ~/.jsonpadrc
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(rc_path) = Self::get_rc_path() {
            if let Ok(contents) = fs::read_to_string(&rc_path) {
                config.parse(&contents);
            }
        }

        config
    }

    /// Get the path to ~/.jsonpadrc
    fn get_rc_path() -> Option<PathBuf> {
        dirs::home_dir().map(|mut path| {
            path.push(".jsonpadrc");
            path
        })
    }

    /// Parse RC file contents
    fn parse(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }

            self.parse_line(line);
        }
    }

    /// Parse a single line
    fn parse_line(&mut self, line: &str) {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.is_empty() {
            return;
        }

        match parts[0] {
            "set" => {
                if parts.len() >= 2 {
                    self.handle_set(&parts[1..]);
                }
            }
            _ => {
                // Unknown command, ignore
            }
        }
    }

    /// Handle 'set' command
    fn handle_set(&mut self, args: &[&str]) {
        if args.is_empty() {
            return;
        }

        let option = args[0];

        if let Some(value_str) = option.strip_prefix("datadir=") {
            if !value_str.is_empty() {
                self.data_dir = Some(PathBuf::from(value_str));
            }
        } else if let Some(value_str) = option.strip_prefix("backups=") {
            if let Ok(value) = value_str.parse::<usize>() {
                // 0 means unlimited
                self.keep_backups = if value == 0 { None } else { Some(value) };
            }
        }
        // Unknown option, ignore
    }

    /// Directory documents live in when no override is given.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|mut path| {
                path.push("jsonpad");
                path
            })
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}
