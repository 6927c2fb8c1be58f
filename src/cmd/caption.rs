use anyhow::{Context, Result};

use crate::Cli;

pub async fn cmd_caption(cli: &Cli) -> Result<()> {
    use stenocaptioner::caption::{CaptionPipeline, CaptionStyle};
    use stenocaptioner::config::load_config;

    let settings = load_config()?;
    let mut config = settings.pipeline_config();

    config.transcription = config
        .transcription
        .with_model(cli.model_type.into())
        .with_language(&cli.language);
    config.effect = cli.letter_effect.into();

    let defaults = CaptionStyle::default();
    config.style = CaptionStyle {
        text_color: cli.text_color.clone(),
        background_color: cli.background_color.clone(),
        contour_color: cli.contour_color.clone(),
        contour_width: cli.contour_width.unwrap_or(defaults.contour_width),
        font: cli.font.clone(),
        font_size: cli.fontsize,
        fadein_duration: cli.fadein_duration,
        fadeout_duration: cli.fadeout_duration,
        side_margin: cli.side_margin,
        bottom_margin: cli.bottom_margin,
    };

    if let Some(ref path) = cli.load_text {
        eprintln!("[stenocaptioner] Loading transcript from {}", path.display());
        config.load_text = Some(path.clone());
    }

    if cli.save_text {
        config.save_text = Some(settings.transcription.transcript_file.clone());
    }

    eprintln!("[stenocaptioner] Captioning: {}", cli.url);
    eprintln!(
        "[stenocaptioner] Language: {}, model: {}, letter effect: {}",
        cli.language, config.transcription.model, config.effect
    );

    let pipeline = CaptionPipeline::new(config).context("failed to set up caption pipeline")?;
    let result = pipeline
        .run(&cli.url)
        .await
        .with_context(|| format!("failed to caption {}", cli.url))?;

    if let Some(ref path) = pipeline.config().save_text {
        eprintln!("[stenocaptioner] Transcript saved to {}", path.display());
    }

    eprintln!(
        "[stenocaptioner] Done in {:.1}s: {} captions",
        result.processing_time_secs, result.clip_count
    );
    eprintln!("[stenocaptioner] Output: {}", result.output_path.display());

    Ok(())
}
