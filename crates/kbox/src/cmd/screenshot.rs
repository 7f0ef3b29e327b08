use image::{ImageFormat, RgbImage};
use tracing::info;

use crate::cmd::{Connection, ScreenshotArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ScreenshotArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let mut kbox = connection.connect(format)?;
    let shot = kbox
        .screenshot()
        .map_err(|err| client_error("screenshot failed", err))?;

    let image = RgbImage::from_raw(
        u32::from(shot.width),
        u32::from(shot.height),
        shot.to_rgb8(),
    )
    .ok_or_else(|| CliError::new(INTERNAL, "screenshot does not fill the screen"))?;

    image
        .save_with_format(&args.path, ImageFormat::Png)
        .map_err(|err| {
            CliError::new(
                INTERNAL,
                format!("cannot save {}: {err}", args.path.display()),
            )
        })?;

    info!(path = %args.path.display(), width = shot.width, height = shot.height, "saved screenshot");
    Ok(SUCCESS)
}
