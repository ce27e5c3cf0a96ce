//! Prompt construction for the fitting studio.
//!
//! The wording and ordering of the directives below is what keeps backend
//! output consistent between runs; whitespace is not significant.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

pub const DIVERSE_RACE: &str = "Diverse";
pub const SHOP_DISPLAY_POSE: &str = "Shop Display";
pub const STYLE_NOTES_HEADER: &str = "ADDITIONAL STYLE NOTES:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const POSES: &[CatalogEntry] = &[
    CatalogEntry {
        id: "shop-display",
        label: SHOP_DISPLAY_POSE,
        description: "Relaxed side-angle shot: Waist-down framing with a casual, natural stance",
    },
    CatalogEntry {
        id: "walking",
        label: "Walking Motion",
        description: "Dynamic movement showing fabric drape",
    },
    CatalogEntry {
        id: "side-profile",
        label: "Side Profile",
        description: "Shows silhouette and side seams",
    },
    CatalogEntry {
        id: "back-view",
        label: "Back View",
        description: "Displays rear construction and pockets",
    },
    CatalogEntry {
        id: "sitting",
        label: "Relaxed Sitting",
        description: "Casual lifestyle context",
    },
    CatalogEntry {
        id: "crouching",
        label: "Urban Crouch",
        description: "Modern street-style aesthetic",
    },
];

pub const RACES: &[CatalogEntry] = &[
    CatalogEntry { id: "diverse", label: DIVERSE_RACE, description: "" },
    CatalogEntry { id: "caucasian", label: "Caucasian", description: "" },
    CatalogEntry { id: "black", label: "Black", description: "" },
    CatalogEntry { id: "asian", label: "Asian", description: "" },
    CatalogEntry { id: "hispanic", label: "Hispanic", description: "" },
    CatalogEntry { id: "south-asian", label: "South Asian", description: "" },
    CatalogEntry { id: "middle-eastern", label: "Middle Eastern", description: "" },
];

pub const BACKGROUNDS: &[CatalogEntry] = &[
    CatalogEntry {
        id: "clean",
        label: "Clean",
        description: "Minimalist studio setup with soft shadows",
    },
    CatalogEntry {
        id: "urban",
        label: "Urban",
        description: "Modern city street, concrete and glass",
    },
    CatalogEntry {
        id: "outdoors",
        label: "Outdoors",
        description: "Natural daylight in a park or garden",
    },
    CatalogEntry {
        id: "active",
        label: "Active",
        description: "Dynamic sports court or gym environment",
    },
];

/// Resolves a catalog entry by id or label, case-insensitively. Unknown values
/// are passed through by callers; the prompt itself never validates them.
pub fn lookup_label(catalog: &[CatalogEntry], value: &str) -> Option<&'static str> {
    let needle = value.trim();
    catalog
        .iter()
        .find(|entry| {
            entry.id.eq_ignore_ascii_case(needle) || entry.label.eq_ignore_ascii_case(needle)
        })
        .map(|entry| entry.label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    #[default]
    Female,
    Male,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Female => "female",
            ModelType::Male => "male",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "female" => Ok(ModelType::Female),
            "male" => Ok(ModelType::Male),
            other => Err(anyhow!("Unknown model type '{other}' (expected female or male)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    Square,
    #[default]
    Portrait,
    Landscape,
    Story,
    Wide,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Story,
        AspectRatio::Wide,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Story => "9:16",
            AspectRatio::Wide => "16:9",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Portrait => "Portrait (3:4)",
            AspectRatio::Landscape => "Landscape (4:3)",
            AspectRatio::Story => "Story (9:16)",
            AspectRatio::Wide => "Wide (16:9)",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| {
                anyhow!(
                    "Unsupported aspect ratio '{trimmed}' (expected one of 1:1, 3:4, 4:3, 9:16, 16:9)"
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittingConfig {
    pub model_type: ModelType,
    pub model_race: String,
    pub pose: String,
    pub background: String,
    pub aspect_ratio: AspectRatio,
    pub custom_instructions: Option<String>,
}

impl Default for FittingConfig {
    fn default() -> Self {
        FittingConfig {
            model_type: ModelType::Female,
            model_race: DIVERSE_RACE.to_string(),
            pose: SHOP_DISPLAY_POSE.to_string(),
            background: "Clean".to_string(),
            aspect_ratio: AspectRatio::Portrait,
            custom_instructions: None,
        }
    }
}

impl FittingConfig {
    pub fn is_shop_display(&self) -> bool {
        self.pose == SHOP_DISPLAY_POSE
    }

    fn style_notes(&self) -> Option<&str> {
        self.custom_instructions
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
    }
}

pub fn environment_description(background: &str) -> &'static str {
    match background {
        "Urban" => "A stylish urban city street at golden hour, featuring concrete textures and modern architecture.",
        "Outdoors" => "A lush outdoor setting with vibrant tropical plants, soft natural sunlight, and a premium resort vibe.",
        "Active" => "A modern and colorful basketball court or community space with clean lines and dynamic energy.",
        _ => "A professional high-key photo studio with a clean white floor and background, subtle depth, and soft lighting.",
    }
}

pub fn model_descriptor(model_race: &str) -> String {
    if model_race == DIVERSE_RACE {
        "fashion model".to_string()
    } else {
        format!("{model_race} fashion model")
    }
}

pub fn build_generation_prompt(config: &FittingConfig) -> String {
    let shop_display = config.is_shop_display();
    let descriptor = model_descriptor(&config.model_race);

    let subject = if shop_display {
        "The lower body, hips, and legs".to_string()
    } else {
        format!("A full {}", config.model_type)
    };
    let pose = if shop_display {
        "Standing in a relaxed, 3/4 side-angle posture. One hand might be casually tucked in a pocket. The stance is natural and effortless, captured from the mid-torso or waist down.".to_string()
    } else {
        format!("The model is in a {} position.", config.pose)
    };
    let focus_directive = if shop_display {
        "- Focus primarily on the bottom half. Framing should be from the waist down to the feet, highlighting the side profile and front of the pants."
    } else {
        "- The model should have an \"adventurous and joyful\" expression or vibe."
    };
    let framing = if shop_display {
        "- Relaxed 3/4 side view framing. Legs and feet are clearly visible."
    } else {
        "- Full body framing from hips to feet."
    };

    let mut lines = vec![
        "High-end professional photography for Zimbabalooba brand.".to_string(),
        format!(
            "Subject: {subject} {descriptor} wearing the exact African cotton pants from the uploaded image."
        ),
        format!("Pose: {pose}"),
        format!("Environment: {}", environment_description(&config.background)),
        String::new(),
    ];

    if let Some(notes) = config.style_notes() {
        lines.push(format!("{STYLE_NOTES_HEADER} {notes}"));
        lines.push(String::new());
    }

    lines.extend([
        "CRITICAL BRAND DETAILS:".to_string(),
        "- Preserve the exact hand-dyed patterns, vibrant colors, and 100% African cotton texture of the original pants.".to_string(),
        "- Ensure the fabric looks natural, with realistic folds and drape.".to_string(),
        focus_directive.to_string(),
        "- The pants must be the absolute centerpiece of the composition.".to_string(),
        String::new(),
        "Aesthetics:".to_string(),
        framing.to_string(),
        "- Model wears casual, minimalist footwear like suede clogs or simple leather sandals (similar to Birkenstocks) to complement the relaxed aesthetic.".to_string(),
        "- Lighting should highlight the unique dye patterns and high-quality weave of the fabric.".to_string(),
        "- Professional depth of field, model is in sharp focus.".to_string(),
        "Resolution: Studio-grade quality, commercial advertisement ready.".to_string(),
    ]);

    lines.join("\n")
}

/// Wraps a free-text edit request. Callers reject blank instructions first.
pub fn build_edit_instruction(edit_instruction: &str) -> String {
    format!(
        "Edit this photoshoot: \"{}\".\nMaintain the model's pose and the specific textures of the Zimbabalooba fabric.",
        edit_instruction.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_BODY_FRAMING: &str = "Full body framing from hips to feet.";
    const WAIST_DOWN_FRAMING: &str = "Framing should be from the waist down to the feet";

    fn walking_config() -> FittingConfig {
        FittingConfig {
            model_type: ModelType::Male,
            model_race: "Asian".to_string(),
            pose: "Walking Motion".to_string(),
            background: "Urban".to_string(),
            aspect_ratio: AspectRatio::Wide,
            custom_instructions: Some("  moody dusk tones ".to_string()),
        }
    }

    #[test]
    fn identical_configs_render_identical_prompts() {
        let config = walking_config();
        assert_eq!(
            build_generation_prompt(&config),
            build_generation_prompt(&config.clone())
        );
    }

    #[test]
    fn unknown_and_clean_backgrounds_use_studio_scene() {
        let studio = environment_description("Clean");
        assert!(studio.contains("high-key photo studio"));
        assert_eq!(environment_description("Moonbase"), studio);
        assert_eq!(environment_description("urban"), studio);
        assert_ne!(environment_description("Urban"), studio);
        assert_ne!(environment_description("Outdoors"), studio);
        assert_ne!(environment_description("Active"), studio);

        let config = FittingConfig {
            background: "Moonbase".to_string(),
            ..FittingConfig::default()
        };
        assert!(build_generation_prompt(&config).contains(&format!("Environment: {studio}")));
    }

    #[test]
    fn diverse_race_has_no_qualifier() {
        let config = FittingConfig {
            pose: "Back View".to_string(),
            ..FittingConfig::default()
        };
        let prompt = build_generation_prompt(&config);
        assert!(prompt.contains("Subject: A full female fashion model wearing"));
        assert!(!prompt.contains("Diverse"));

        assert_eq!(model_descriptor("Diverse"), "fashion model");
        assert_eq!(model_descriptor("diverse"), "diverse fashion model");
        assert_eq!(model_descriptor("South Asian"), "South Asian fashion model");
    }

    #[test]
    fn explicit_race_is_rendered_before_fashion_model() {
        let prompt = build_generation_prompt(&walking_config());
        assert!(prompt.contains("Subject: A full male Asian fashion model wearing"));
        assert_eq!(prompt.matches("Asian fashion model").count(), 1);
    }

    #[test]
    fn shop_display_uses_waist_down_framing() {
        let prompt = build_generation_prompt(&FittingConfig::default());
        assert!(prompt.contains("Subject: The lower body, hips, and legs fashion model"));
        assert!(prompt.contains(WAIST_DOWN_FRAMING));
        assert!(prompt.contains("Relaxed 3/4 side view framing."));
        assert!(!prompt.contains(FULL_BODY_FRAMING));
        assert!(!prompt.contains("The model is in a"));
        assert!(prompt.contains("Pose: Standing in a relaxed, 3/4 side-angle posture."));
    }

    #[test]
    fn other_poses_use_full_body_framing() {
        let prompt = build_generation_prompt(&walking_config());
        assert!(prompt.contains("Pose: The model is in a Walking Motion position."));
        assert!(prompt.contains(FULL_BODY_FRAMING));
        assert!(prompt.contains("\"adventurous and joyful\""));
        assert!(!prompt.contains(WAIST_DOWN_FRAMING));
        assert!(prompt.contains(environment_description("Urban")));
    }

    #[test]
    fn style_notes_block_only_for_non_blank_instructions() {
        for notes in [None, Some(String::new()), Some(" \n\t ".to_string())] {
            let config = FittingConfig {
                custom_instructions: notes,
                ..FittingConfig::default()
            };
            assert!(!build_generation_prompt(&config).contains(STYLE_NOTES_HEADER));
        }

        let prompt = build_generation_prompt(&walking_config());
        assert_eq!(prompt.matches(STYLE_NOTES_HEADER).count(), 1);
        assert!(prompt.contains("ADDITIONAL STYLE NOTES: moody dusk tones\n"));
    }

    #[test]
    fn directives_keep_their_order() {
        let prompt = build_generation_prompt(&walking_config());
        let order = [
            "Zimbabalooba brand",
            "Subject:",
            "Pose:",
            "Environment:",
            STYLE_NOTES_HEADER,
            "CRITICAL BRAND DETAILS:",
            "hand-dyed patterns",
            "absolute centerpiece",
            "Aesthetics:",
            "footwear",
            "Resolution:",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| prompt.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn edit_instruction_wraps_text_and_keeps_pose_directive() {
        let instruction = build_edit_instruction("  make the sky pink ");
        assert!(instruction.starts_with("Edit this photoshoot: \"make the sky pink\"."));
        assert!(instruction.contains("Maintain the model's pose"));
    }

    #[test]
    fn parses_catalog_values() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Story);
        assert!("2:1".parse::<AspectRatio>().is_err());
        assert_eq!("MALE".parse::<ModelType>().unwrap(), ModelType::Male);
        assert_eq!(lookup_label(POSES, "walking"), Some("Walking Motion"));
        assert_eq!(lookup_label(BACKGROUNDS, "outdoors"), Some("Outdoors"));
        assert_eq!(lookup_label(RACES, "south-asian"), Some("South Asian"));
        assert_eq!(lookup_label(POSES, "handstand"), None);
        assert_eq!(POSES[0].label, SHOP_DISPLAY_POSE);
    }
}
