use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use tracing::{error, info, warn};

mod config;
mod error;
mod image;
mod llm;
mod prompt;
mod session;
mod utils;

use config::Config;
use image::EncodedImage;
use llm::{GeminiHttpTransport, GenerationClient, Tier};
use prompt::{AspectRatio, FittingConfig, ModelType, BACKGROUNDS, POSES, RACES};
use session::StudioSession;
use utils::logging::init_logging;

const DEFAULT_OUTPUT_PATH: &str = "fitting.png";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Catalog,
    Generate(GenerateArgs),
    Edit(EditArgs),
}

#[derive(Debug, Clone, PartialEq)]
struct GenerateArgs {
    image: PathBuf,
    config: FittingConfig,
    tier: Tier,
    edits: Vec<String>,
    fallback_pro: bool,
    out: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
struct EditArgs {
    image: PathBuf,
    instructions: Vec<String>,
    tier: Tier,
    out: PathBuf,
}

fn usage() -> &'static str {
    "Usage:\n  fitting_studio catalog\n  fitting_studio generate --image <path> [--model-type female|male] [--race <label>] [--pose <label>] [--background <label>] [--aspect-ratio <ratio>] [--notes <text>] [--tier standard|pro] [--edit <text>]... [--fallback-pro] [--out <path>]\n  fitting_studio edit --image <path> --instruction <text> [--instruction <text>]... [--tier standard|pro] [--out <path>]"
}

fn next_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing value for {flag}"))
}

/// Catalog ids and labels resolve to the canonical label; anything else is
/// passed to the prompt verbatim.
fn catalog_value(catalog: &[prompt::CatalogEntry], value: &str, kind: &str) -> String {
    match prompt::lookup_label(catalog, value) {
        Some(label) => label.to_string(),
        None => {
            warn!("'{}' is not a known {}; using it verbatim", value, kind);
            value.to_string()
        }
    }
}

fn parse_generate_args(args: &[String]) -> anyhow::Result<GenerateArgs> {
    let mut image = None;
    let mut config = FittingConfig::default();
    let mut tier = Tier::Standard;
    let mut edits = Vec::new();
    let mut fallback_pro = false;
    let mut out = PathBuf::from(DEFAULT_OUTPUT_PATH);

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--image" => image = Some(PathBuf::from(next_value(args, &mut index, flag)?)),
            "--model-type" => {
                config.model_type = next_value(args, &mut index, flag)?.parse::<ModelType>()?
            }
            "--race" => {
                config.model_race =
                    catalog_value(RACES, next_value(args, &mut index, flag)?, "ethnicity")
            }
            "--pose" => {
                config.pose = catalog_value(POSES, next_value(args, &mut index, flag)?, "pose")
            }
            "--background" => {
                config.background =
                    catalog_value(BACKGROUNDS, next_value(args, &mut index, flag)?, "background")
            }
            "--aspect-ratio" => {
                config.aspect_ratio = next_value(args, &mut index, flag)?.parse::<AspectRatio>()?
            }
            "--notes" => {
                config.custom_instructions = Some(next_value(args, &mut index, flag)?.to_string())
            }
            "--tier" => tier = next_value(args, &mut index, flag)?.parse::<Tier>()?,
            "--edit" => edits.push(next_value(args, &mut index, flag)?.to_string()),
            "--fallback-pro" => fallback_pro = true,
            "--out" => out = PathBuf::from(next_value(args, &mut index, flag)?),
            other => return Err(anyhow!("Unknown generate argument: {other}\n{}", usage())),
        }
        index += 1;
    }

    Ok(GenerateArgs {
        image: image.ok_or_else(|| anyhow!("--image is required"))?,
        config,
        tier,
        edits,
        fallback_pro,
        out,
    })
}

fn parse_edit_args(args: &[String]) -> anyhow::Result<EditArgs> {
    let mut image = None;
    let mut instructions = Vec::new();
    let mut tier = Tier::Standard;
    let mut out = PathBuf::from(DEFAULT_OUTPUT_PATH);

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--image" => image = Some(PathBuf::from(next_value(args, &mut index, flag)?)),
            "--instruction" => instructions.push(next_value(args, &mut index, flag)?.to_string()),
            "--tier" => tier = next_value(args, &mut index, flag)?.parse::<Tier>()?,
            "--out" => out = PathBuf::from(next_value(args, &mut index, flag)?),
            other => return Err(anyhow!("Unknown edit argument: {other}\n{}", usage())),
        }
        index += 1;
    }

    if instructions.is_empty() {
        return Err(anyhow!("--instruction is required"));
    }

    Ok(EditArgs {
        image: image.ok_or_else(|| anyhow!("--image is required"))?,
        instructions,
        tier,
        out,
    })
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    match args.get(1).map(String::as_str) {
        Some("catalog") => Ok(Command::Catalog),
        Some("generate") => Ok(Command::Generate(parse_generate_args(&args[2..])?)),
        Some("edit") => Ok(Command::Edit(parse_edit_args(&args[2..])?)),
        Some("--help" | "-h" | "help") | None => Err(anyhow!(usage())),
        Some(other) => Err(anyhow!("Unknown command: {other}\n{}", usage())),
    }
}

fn render_catalog() -> String {
    let mut out = String::new();
    out.push_str("Poses:\n");
    for pose in POSES {
        out.push_str(&format!("  {:<14} {:<16} {}\n", pose.id, pose.label, pose.description));
    }
    out.push_str("Ethnicities:\n");
    for race in RACES {
        out.push_str(&format!("  {:<14} {}\n", race.id, race.label));
    }
    out.push_str("Backgrounds:\n");
    for background in BACKGROUNDS {
        out.push_str(&format!(
            "  {:<14} {:<16} {}\n",
            background.id, background.label, background.description
        ));
    }
    out.push_str("Aspect ratios:\n");
    for ratio in AspectRatio::ALL {
        out.push_str(&format!("  {:<14} {}\n", ratio.as_str(), ratio.label()));
    }
    out
}

/// Accepts either a raw image file or a text file holding a data URL.
async fn read_image_file(path: &Path) -> anyhow::Result<EncodedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    if bytes.starts_with(b"data:") {
        let text = String::from_utf8(bytes).context("Data URL file is not valid UTF-8")?;
        return Ok(EncodedImage::parse(text.trim())?);
    }
    Ok(EncodedImage::from_bytes(&bytes)?)
}

async fn write_image_file(path: &Path, image: &EncodedImage) -> anyhow::Result<()> {
    let bytes = image
        .decode_bytes()
        .context("Backend returned an image that is not valid base64")?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write image {}", path.display()))
}

fn report_failure(session: &StudioSession) {
    let Some(err) = session.last_error() else {
        return;
    };
    error!("Studio request failed ({}): {}", err.category(), err);
    if session.suggests_pro_upgrade() {
        eprintln!("Hint: rerun with --tier pro to use your own billable key.");
    }
    if session.needs_credential_reselection() {
        eprintln!("Hint: check GEMINI_API_KEY before retrying.");
    }
}

async fn run_generate(client: GenerationClient, args: GenerateArgs) -> anyhow::Result<()> {
    let source = read_image_file(&args.image).await?;
    let mut session = StudioSession::new(client, args.tier);

    info!(
        "Generating {} shot ({}, {}, {}) on {} tier",
        args.config.pose,
        args.config.background,
        args.config.aspect_ratio,
        args.config.model_type,
        args.tier
    );
    let source = source.to_string();
    let mut outcome = session.generate(&source, &args.config).await.map(|_| ());
    if outcome.is_err() && args.fallback_pro && session.suggests_pro_upgrade() {
        warn!("Standard tier quota exhausted; retrying once on the pro tier");
        session.set_tier(Tier::Pro);
        outcome = session.generate(&source, &args.config).await.map(|_| ());
    }
    if let Err(err) = outcome {
        report_failure(&session);
        return Err(err.into());
    }

    for instruction in &args.edits {
        info!("Applying edit on {} tier: {}", session.tier(), instruction);
        let outcome = session.edit(instruction).await.map(|_| ());
        if let Err(err) = outcome {
            report_failure(&session);
            return Err(err.into());
        }
    }

    let result = session
        .result()
        .ok_or_else(|| anyhow!("Session finished without a result"))?;
    write_image_file(&args.out, result).await?;
    println!("{}", args.out.display());
    Ok(())
}

async fn run_edit(client: GenerationClient, args: EditArgs) -> anyhow::Result<()> {
    let source = read_image_file(&args.image).await?;
    let mut current = source;

    for instruction in &args.instructions {
        info!("Applying edit on {} tier: {}", args.tier, instruction);
        current = client
            .edit(&current.to_string(), instruction, args.tier)
            .await
            .map_err(|err| {
                error!("Studio request failed ({}): {}", err.category(), err);
                err
            })?;
    }

    write_image_file(&args.out, &current).await?;
    println!("{}", args.out.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::load()?;
    let _guards = init_logging(&config.log_level, &config.log_dir);

    let args: Vec<String> = std::env::args().collect();
    let command = parse_command(&args)?;
    if command == Command::Catalog {
        print!("{}", render_catalog());
        return Ok(());
    }

    let transport = GeminiHttpTransport::from_config(&config)?;
    let client = GenerationClient::new(
        Arc::new(transport),
        config.tier_table(),
        config.gemini_api_key.clone(),
    );

    match command {
        Command::Generate(args) => run_generate(client, args).await,
        Command::Edit(args) => run_edit(client, args).await,
        Command::Catalog => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("fitting_studio")
            .chain(items.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn generate_args_resolve_catalog_ids_and_keep_unknown_values() {
        let command = parse_command(&argv(&[
            "generate",
            "--image",
            "pants.jpg",
            "--model-type",
            "male",
            "--race",
            "south-asian",
            "--pose",
            "walking",
            "--background",
            "Rooftop",
            "--aspect-ratio",
            "16:9",
            "--notes",
            "soft dusk light",
            "--tier",
            "pro",
            "--edit",
            "add a hat",
            "--edit",
            "warmer tones",
            "--fallback-pro",
        ]))
        .unwrap();

        let Command::Generate(args) = command else {
            panic!("expected generate command");
        };
        assert_eq!(args.image, PathBuf::from("pants.jpg"));
        assert_eq!(args.config.model_type, ModelType::Male);
        assert_eq!(args.config.model_race, "South Asian");
        assert_eq!(args.config.pose, "Walking Motion");
        assert_eq!(args.config.background, "Rooftop");
        assert_eq!(args.config.aspect_ratio, AspectRatio::Wide);
        assert_eq!(args.config.custom_instructions.as_deref(), Some("soft dusk light"));
        assert_eq!(args.tier, Tier::Pro);
        assert_eq!(args.edits, vec!["add a hat", "warmer tones"]);
        assert!(args.fallback_pro);
        assert_eq!(args.out, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }

    #[test]
    fn generate_defaults_to_shop_display_on_standard_tier() {
        let Command::Generate(args) =
            parse_command(&argv(&["generate", "--image", "pants.png"])).unwrap()
        else {
            panic!("expected generate command");
        };
        assert_eq!(args.config, FittingConfig::default());
        assert_eq!(args.tier, Tier::Standard);
        assert!(!args.fallback_pro);
    }

    #[test]
    fn rejects_missing_and_unknown_arguments() {
        assert!(parse_command(&argv(&["generate"])).is_err());
        assert!(parse_command(&argv(&["generate", "--image"])).is_err());
        assert!(
            parse_command(&argv(&["generate", "--image", "a.png", "--aspect-ratio", "2:1"]))
                .is_err()
        );
        assert!(parse_command(&argv(&["edit", "--image", "a.png"])).is_err());
        assert!(parse_command(&argv(&["render"])).is_err());
        assert!(parse_command(&argv(&[])).is_err());
        assert_eq!(parse_command(&argv(&["catalog"])).unwrap(), Command::Catalog);
    }

    #[test]
    fn catalog_lists_every_option() {
        let rendered = render_catalog();
        for label in POSES.iter().chain(RACES).chain(BACKGROUNDS).map(|entry| entry.label) {
            assert!(rendered.contains(label), "missing {label}");
        }
        assert!(rendered.contains("Story (9:16)"));
    }

    #[tokio::test]
    async fn reads_raw_images_and_data_url_files() {
        let dir = tempfile::tempdir().unwrap();
        let png = [
            0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
            0x44, 0x52,
        ];
        let raw_path = dir.path().join("upload.png");
        std::fs::write(&raw_path, png).unwrap();
        let raw = read_image_file(&raw_path).await.unwrap();
        assert_eq!(raw.mime_type(), "image/png");

        let url_path = dir.path().join("upload.txt");
        std::fs::write(&url_path, "data:image/jpeg;base64,QUJD\n").unwrap();
        let from_url = read_image_file(&url_path).await.unwrap();
        assert_eq!(from_url.to_string(), "data:image/jpeg;base64,QUJD");

        let out_path = dir.path().join("out.png");
        write_image_file(&out_path, &raw).await.unwrap();
        assert_eq!(std::fs::read(&out_path).unwrap(), png.to_vec());
    }
}
