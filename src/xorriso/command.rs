//! Argument builder for xorriso invocations
//!
//! Every call appends tokens to an ordered list. Nothing here executes,
//! quotes or validates anything: the tokens are handed to the process
//! spawner as separate argv entries, so no shell ever sees them.

/// Chainable builder for one xorriso argument list
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    args: Vec<String>,
}

/// Render a toggle as xorriso's explicit `on`/`off` value
fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(tokens.into_iter().map(Into::into));
        self
    }

    fn toggle(&mut self, flag: &str, on: bool) -> &mut Self {
        self.push([flag, on_off(on)])
    }

    // Basic settings

    pub fn pkt_output(&mut self) -> &mut Self {
        self.toggle("-pkt_output", true)
    }

    pub fn device(&mut self, dev: &str) -> &mut Self {
        self.push(["-dev", dev])
    }

    pub fn in_device(&mut self, dev: &str) -> &mut Self {
        self.push(["-indev", dev])
    }

    pub fn out_device(&mut self, dev: &str) -> &mut Self {
        self.push(["-outdev", dev])
    }

    // Information queries

    pub fn device_links(&mut self) -> &mut Self {
        self.push(["-device_links"])
    }

    pub fn toc(&mut self) -> &mut Self {
        self.push(["-toc"])
    }

    pub fn list_formats(&mut self) -> &mut Self {
        self.push(["-list_formats"])
    }

    pub fn list_speeds(&mut self) -> &mut Self {
        self.push(["-list_speeds"])
    }

    pub fn list_profiles(&mut self, which: &str) -> &mut Self {
        self.push(["-list_profiles", which])
    }

    pub fn tell_media_space(&mut self) -> &mut Self {
        self.push(["-tell_media_space"])
    }

    pub fn check_drive(&mut self) -> &mut Self {
        self.push(["-checkdrive"])
    }

    pub fn print_size(&mut self) -> &mut Self {
        self.push(["-print_size"])
    }

    pub fn pvd_info(&mut self) -> &mut Self {
        self.push(["-pvd_info"])
    }

    // ISO 9660 image options

    pub fn volume_id(&mut self, id: &str) -> &mut Self {
        self.push(["-volid", id])
    }

    pub fn rock_ridge(&mut self, on: bool) -> &mut Self {
        self.toggle("-rockridge", on)
    }

    pub fn joliet(&mut self, on: bool) -> &mut Self {
        self.toggle("-joliet", on)
    }

    pub fn md5(&mut self, mode: &str) -> &mut Self {
        self.push(["-md5", mode])
    }

    pub fn for_backup(&mut self) -> &mut Self {
        self.push(["-for_backup"])
    }

    // File operations

    /// Insert `source` from disk at `dest` inside the image
    pub fn map(&mut self, source: &str, dest: &str) -> &mut Self {
        self.push(["-map", source, dest])
    }

    /// Add paths to the image; the list is always closed with `--`
    pub fn add<I, S>(&mut self, paths: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(["-add"]);
        self.push(paths);
        self.push(["--"])
    }

    // Write operations

    pub fn speed(&mut self, speed: &str) -> &mut Self {
        self.push(["-speed", speed])
    }

    pub fn dummy(&mut self, on: bool) -> &mut Self {
        self.toggle("-dummy", on)
    }

    pub fn close(&mut self, on: bool) -> &mut Self {
        self.toggle("-close", on)
    }

    pub fn stream_recording(&mut self, on: bool) -> &mut Self {
        self.toggle("-stream_recording", on)
    }

    pub fn pacifier(&mut self, format: &str) -> &mut Self {
        self.push(["-pacifier", format])
    }

    pub fn commit(&mut self) -> &mut Self {
        self.push(["-commit"])
    }

    pub fn eject(&mut self, which: &str) -> &mut Self {
        self.push(["-eject", which])
    }

    // Blanking and formatting

    pub fn blank(&mut self, mode: &str) -> &mut Self {
        self.push(["-blank", mode])
    }

    pub fn format(&mut self, mode: &str) -> &mut Self {
        self.push(["-format", mode])
    }

    // Verification

    /// `-check_media` with `key=value` options in the given order, closed with `--`
    pub fn check_media(&mut self, opts: &[(&str, &str)]) -> &mut Self {
        self.push(["-check_media"]);
        self.push(opts.iter().map(|(k, v)| format!("{}={}", k, v)));
        self.push(["--"])
    }

    pub fn compare(&mut self, disk_path: &str, iso_path: &str) -> &mut Self {
        self.push(["-compare", disk_path, iso_path])
    }

    // Extraction

    pub fn osirrox(&mut self, mode: &str) -> &mut Self {
        self.push(["-osirrox", mode])
    }

    pub fn extract(&mut self, iso_path: &str, disk_path: &str) -> &mut Self {
        self.push(["-extract", iso_path, disk_path])
    }

    // Error handling

    pub fn abort_on(&mut self, severity: &str) -> &mut Self {
        self.push(["-abort_on", severity])
    }

    pub fn report_about(&mut self, severity: &str) -> &mut Self {
        self.push(["-report_about", severity])
    }

    /// Finalize the argument list
    pub fn build(&self) -> Vec<String> {
        self.args.clone()
    }
}
