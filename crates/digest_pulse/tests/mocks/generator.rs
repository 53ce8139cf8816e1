use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use digest_pulse::{Error, PromptRole, TextGenerator};

pub const DEFAULT_SCRIPT: &str = "男: 大家好，欢迎收听\n女：今天有三个故事\n\n男: 我们开始吧";

#[derive(Clone)]
pub struct MockGenerator {
    pub calls: Arc<Mutex<Vec<(PromptRole, String)>>>,
    pub podcast_script: String,
    /// Suffix appended to every output, to tell generations apart
    pub tag: String,
    pub fail_roles: HashSet<PromptRole>,
    /// Story payloads with one of these titles fail
    pub fail_titles: HashSet<String>,
    pub fail_with: Option<String>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            podcast_script: DEFAULT_SCRIPT.to_string(),
            tag: String::new(),
            fail_roles: HashSet::new(),
            fail_titles: HashSet::new(),
            fail_with: None,
        }
    }
}

impl MockGenerator {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn with_script(mut self, script: &str) -> Self {
        self.podcast_script = script.to_string();
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn failing_role(mut self, role: PromptRole) -> Self {
        self.fail_roles.insert(role);
        self
    }

    pub fn failing_titles(mut self, titles: &[&str]) -> Self {
        self.fail_titles = titles.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn calls_for(&self, role: PromptRole) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Summary text produced for the story titled `title`
    pub fn summary_for(title: &str) -> String {
        format!("Summary of {title}")
    }
}

/// The title section always opens a story payload
fn payload_title(payload: &str) -> &str {
    payload.lines().nth(1).unwrap_or_default().trim()
}

impl TextGenerator for MockGenerator {
    async fn generate(&self, role: PromptRole, payload: &str) -> Result<String, Error> {
        self.calls.lock().unwrap().push((role, payload.to_string()));

        if let Some(ref msg) = self.fail_with {
            return Err(Error::TransientUpstream(msg.clone()));
        }
        if self.fail_roles.contains(&role) {
            return Err(Error::TransientUpstream(format!("{role} unavailable")));
        }

        let text = match role {
            PromptRole::Story => {
                let title = payload_title(payload);
                if self.fail_titles.contains(title) {
                    return Err(Error::TransientUpstream(format!("cannot summarize {title}")));
                }
                Self::summary_for(title)
            }
            PromptRole::Podcast => return Ok(self.podcast_script.clone()),
            PromptRole::Blog => format!("Blog post from {} characters", payload.len()),
            PromptRole::Intro => "今天的节目有三个故事".to_string(),
        };
        Ok(format!("{text}{}", self.tag))
    }
}
