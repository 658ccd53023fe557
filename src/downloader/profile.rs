use std::sync::RwLock;

/// 提供当前激活的档案，只用于读取时的可见性过滤
pub trait ProfileProvider: Send + Sync {
    fn current_profile(&self) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct ActiveProfile {
    current: RwLock<Option<String>>,
}

impl ActiveProfile {
    pub fn new(profile: Option<&str>) -> Self {
        Self {
            current: RwLock::new(profile.map(str::to_string)),
        }
    }

    pub fn switch_to(&self, profile: Option<&str>) {
        if let Ok(mut current) = self.current.write() {
            *current = profile.map(str::to_string);
        }
    }
}

impl ProfileProvider for ActiveProfile {
    fn current_profile(&self) -> Option<String> {
        self.current.read().ok().and_then(|current| current.clone())
    }
}
