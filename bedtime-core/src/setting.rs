//! The fixed catalogue of story settings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a story takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Setting {
    Forest,
    Castle,
    Ocean,
    ToyWorld,
    Ranch,
    Space,
}

impl Setting {
    /// All settings in menu order.
    pub const ALL: [Setting; 6] = [
        Setting::Forest,
        Setting::Castle,
        Setting::Ocean,
        Setting::ToyWorld,
        Setting::Ranch,
        Setting::Space,
    ];

    /// Look up a setting by its 1-based menu number.
    pub fn from_menu(choice: usize) -> Option<Self> {
        choice
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Stable identifier, also used in prompts and on disk.
    pub fn name(&self) -> &'static str {
        match self {
            Setting::Forest => "forest",
            Setting::Castle => "castle",
            Setting::Ocean => "ocean",
            Setting::ToyWorld => "toy-world",
            Setting::Ranch => "ranch",
            Setting::Space => "space",
        }
    }

    /// Example protagonists that fit this setting.
    pub fn character_hint(&self) -> &'static str {
        match self {
            Setting::Forest => "little rabbit, little squirrel, little deer",
            Setting::Castle => "little prince, little princess, little knight",
            Setting::Ocean => "little dolphin, little turtle, little octopus",
            Setting::ToyWorld => "little puppet, little teddy bear, little robot",
            Setting::Ranch => "little lamb, little calf, little pony",
            Setting::Space => "little star, little rocket, little astronaut",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lookup() {
        assert_eq!(Setting::from_menu(1), Some(Setting::Forest));
        assert_eq!(Setting::from_menu(4), Some(Setting::ToyWorld));
        assert_eq!(Setting::from_menu(6), Some(Setting::Space));
        assert_eq!(Setting::from_menu(0), None);
        assert_eq!(Setting::from_menu(7), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Setting::ToyWorld.to_string(), "toy-world");
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&Setting::ToyWorld).unwrap();
        assert_eq!(json, "\"toy-world\"");
        let back: Setting = serde_json::from_str("\"ranch\"").unwrap();
        assert_eq!(back, Setting::Ranch);
    }
}
