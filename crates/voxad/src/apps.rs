//! Application registry for the "open <app>" intent.
//!
//! Maps spoken application names to either a web URL or a local program.
//! Resolution is best-effort: an exact name wins outright, otherwise the
//! entry whose name overlaps the request most (by length ratio) is picked.
//! Short ambiguous requests can resolve to the wrong entry ("words" picks
//! "word"), so treat a match as a guess.

use serde::{Deserialize, Serialize};

/// Where an application lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppTarget {
    /// Opened in the browser
    Web { url: String },
    /// Runs on the user's machine
    Local { command: String },
}

impl AppTarget {
    pub fn web(url: &str) -> Self {
        Self::Web {
            url: url.to_string(),
        }
    }

    pub fn local(command: &str) -> Self {
        Self::Local {
            command: command.to_string(),
        }
    }
}

/// Outcome of a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedApp<'a> {
    pub name: &'a str,
    pub target: &'a AppTarget,
    /// 1.0 for exact or containing matches, lower for partial overlaps
    pub score: f64,
}

/// Ordered name -> target table. Order breaks scoring ties.
#[derive(Debug, Clone)]
pub struct AppRegistry {
    entries: Vec<(String, AppTarget)>,
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AppRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Built-in desktop programs and web apps
    pub fn builtin() -> Self {
        let local = [
            ("notepad", "notepad.exe"),
            ("calculator", "calc.exe"),
            ("paint", "mspaint.exe"),
            ("word", "winword.exe"),
            ("excel", "excel.exe"),
            ("powerpoint", "powerpnt.exe"),
            ("chrome", "chrome.exe"),
            ("firefox", "firefox.exe"),
            ("edge", "msedge.exe"),
            ("recycle bin", "explorer.exe shell:RecycleBinFolder"),
            ("file explorer", "explorer.exe"),
            ("command prompt", "cmd.exe"),
            ("task manager", "taskmgr.exe"),
        ];
        let web = [
            ("youtube", "https://www.youtube.com"),
            ("gmail", "https://mail.google.com"),
            ("google maps", "https://maps.google.com"),
            ("github", "https://github.com"),
            ("spotify", "https://open.spotify.com"),
            ("netflix", "https://www.netflix.com"),
        ];

        let entries = local
            .iter()
            .map(|(name, cmd)| (name.to_string(), AppTarget::local(cmd)))
            .chain(web.iter().map(|(name, url)| (name.to_string(), AppTarget::web(url))))
            .collect();
        Self { entries }
    }

    /// Add entries, replacing any existing entry with the same name
    pub fn with_entries<I>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (String, AppTarget)>,
    {
        for (name, target) in extra {
            let name = normalize_app_name(&name);
            if name.is_empty() {
                continue;
            }
            match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = target,
                None => self.entries.push((name, target)),
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Resolve a free-text application name
    pub fn resolve(&self, requested: &str) -> Option<ResolvedApp<'_>> {
        let wanted = normalize_app_name(requested);
        if wanted.is_empty() {
            return None;
        }

        if let Some((name, target)) = self.entries.iter().find(|(name, _)| *name == wanted) {
            return Some(ResolvedApp {
                name,
                target,
                score: 1.0,
            });
        }

        let wanted_len = wanted.chars().count() as f64;
        let mut best: Option<ResolvedApp<'_>> = None;
        for (name, target) in &self.entries {
            if !(wanted.contains(name.as_str()) || name.contains(wanted.as_str())) {
                continue;
            }
            let score = (name.chars().count() as f64 / wanted_len).min(1.0);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ResolvedApp {
                    name,
                    target,
                    score,
                });
            }
        }
        best
    }
}

/// Lowercase, trim trailing punctuation, drop a leading "the" and a
/// trailing "app"/"application"
pub fn normalize_app_name(raw: &str) -> String {
    let mut name = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '!' | '?'))
        .trim()
        .to_lowercase();

    if let Some(rest) = name.strip_prefix("the ") {
        name = rest.trim_start().to_string();
    }
    for suffix in [" application", " app"] {
        if let Some(rest) = name.strip_suffix(suffix) {
            name = rest.trim_end().to_string();
            break;
        }
    }
    name
}
