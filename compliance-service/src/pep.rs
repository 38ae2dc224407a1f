/// Politically exposed person check by title keyword
#[derive(Debug, Clone)]
pub struct PepChecker {
    keywords: Vec<String>,
}

impl PepChecker {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// First keyword contained in the name, case-insensitively
    pub fn check(&self, full_name: &str) -> Option<&str> {
        let name = full_name.to_lowercase();
        self.keywords
            .iter()
            .find(|k| name.contains(k.as_str()))
            .map(String::as_str)
    }
}

impl Default for PepChecker {
    fn default() -> Self {
        Self::new(["governor", "mayor", "senator"])
    }
}
