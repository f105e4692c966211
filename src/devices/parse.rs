//! Parsers for xorriso's drive and media reports

use regex::Regex;
use std::sync::OnceLock;

use crate::core::{Drive, MediaInfo, MediaProfile, SpeedDescriptor};

/// Bytes per data block on optical media
pub const BLOCK_SIZE: u64 = 2048;

static DEVICE_REGEX: OnceLock<Regex> = OnceLock::new();
static SPEED_REGEX: OnceLock<Regex> = OnceLock::new();
static PROFILE_REGEX: OnceLock<Regex> = OnceLock::new();
static MEDIA_SPACE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Drives from `-devices` / `-device_links` result lines
///
/// `0  -dev '/dev/sr0' rwrw-- :  'HL-DT-ST' 'BD-RE  WH16NS60'`
pub fn parse_drives(lines: &[String]) -> Vec<Drive> {
    let re = DEVICE_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s+-dev\s+'([^']+)'\s+\S+\s+:\s+'([^']*)'\s+'([^']*)'")
            .expect("Invalid device Regex")
    });

    lines
        .iter()
        .filter_map(|line| re.captures(line))
        .map(|caps| Drive {
            path: caps[2].to_string(),
            vendor: caps[3].trim().to_string(),
            model: caps[4].trim().to_string(),
            profiles: Vec::new(),
        })
        .collect()
}

/// Write speeds from `-list_speeds`: `Write speed  :  4234kB/s  (BD  1x)`
pub fn parse_speeds(lines: &[String]) -> Vec<SpeedDescriptor> {
    let re = SPEED_REGEX.get_or_init(|| {
        Regex::new(r"(\d+)kB/s\s+\(([^)]+)\)").expect("Invalid speed Regex")
    });

    lines
        .iter()
        .filter(|line| line.contains("kB/s"))
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| {
            let write_speed = caps[1].parse::<f64>().ok()?;
            Some(SpeedDescriptor {
                write_speed,
                display_name: caps[2].trim().to_string(),
            })
        })
        .collect()
}

/// Media profiles from `-list_profiles`
///
/// `Profile      : 0x0041 (BD-R sequential recording) (current)`
pub fn parse_profiles(lines: &[String]) -> Vec<MediaProfile> {
    let re = PROFILE_REGEX.get_or_init(|| {
        Regex::new(r"Profile\s+:\s+0x([0-9A-Fa-f]+)\s+\(([^)]+)\)").expect("Invalid profile Regex")
    });

    lines
        .iter()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(MediaProfile {
                name: caps[2].trim().to_string(),
                current: line.contains("(current)"),
            })
        })
        .collect()
}

/// Free blocks from `-tell_media_space`: `Media space  : 12219392s  (...)`
pub fn parse_media_space(lines: &[String]) -> Option<u64> {
    let re = MEDIA_SPACE_REGEX
        .get_or_init(|| Regex::new(r"(\d+)s\s+\(").expect("Invalid media space Regex"));

    lines
        .iter()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps[1].parse().ok())
}

/// Assemble [`MediaInfo`] from a `-toc -tell_media_space` run
pub fn parse_media_info(device: &str, result_lines: &[String], info_lines: &[String]) -> MediaInfo {
    let mut info = MediaInfo {
        device_path: device.to_string(),
        free_space: parse_media_space(result_lines)
            .unwrap_or(0)
            .saturating_mul(BLOCK_SIZE),
        ..Default::default()
    };

    // The drive summary shows up on either channel depending on the version
    for line in info_lines.iter().chain(result_lines) {
        if line.contains("Media current:") {
            info.media_type = after_colon(line);
        }
        if line.contains("Media status :") {
            info.media_status = after_colon(line);
        }
        if line.contains("Media erasable") {
            info.erasable = line.contains("is erasable");
        }
    }

    info
}

fn after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}
