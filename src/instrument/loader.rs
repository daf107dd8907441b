//! Custom sample loading — concurrent fetch-and-decode with per-channel failures.

use std::thread;

use log::{debug, warn};

use super::registry::SampleDeclaration;
use super::sample::{SampleData, SampleError};
use super::SampleBank;

/// Where custom sample bytes come from.
///
/// Shared across loader threads, hence `Sync`.
pub trait SampleSource: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SampleError>;
}

/// Reads `file://` URLs from disk and, with the `http` feature, downloads
/// `http://` and `https://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSource;

impl SampleSource for DefaultSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SampleError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(std::fs::read(path)?);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return fetch_http(url);
        }
        Err(SampleError::UnsupportedScheme(url.to_string()))
    }
}

#[cfg(feature = "http")]
fn fetch_http(url: &str) -> Result<Vec<u8>, SampleError> {
    let response =
        reqwest::blocking::get(url).map_err(|e| SampleError::Fetch(format!("{url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SampleError::Fetch(format!("{url}: HTTP {status}")));
    }
    let bytes = response
        .bytes()
        .map_err(|e| SampleError::Fetch(format!("{url}: {e}")))?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "http"))]
fn fetch_http(url: &str) -> Result<Vec<u8>, SampleError> {
    Err(SampleError::Fetch(format!(
        "{url}: built without the `http` feature"
    )))
}

/// Outcome of loading every declared sample.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Decoded samples keyed by channel name.
    pub bank: SampleBank,
    /// Channels that could not be loaded, in declaration order.
    pub failed: Vec<String>,
}

fn load_one(
    decl: &SampleDeclaration,
    source: &dyn SampleSource,
    sample_rate: u32,
) -> Result<SampleData, SampleError> {
    let bytes = source.fetch(&decl.url)?;
    SampleData::from_wav_bytes(&bytes, sample_rate)
}

/// Fetch and decode every declaration concurrently, one thread each.
///
/// A failure only affects its own channel. When a name is declared twice the
/// later declaration is used.
pub fn load_samples(
    decls: &[SampleDeclaration],
    source: &dyn SampleSource,
    sample_rate: u32,
) -> LoadReport {
    let mut unique: Vec<&SampleDeclaration> = Vec::new();
    for decl in decls {
        match unique.iter_mut().find(|d| d.name == decl.name) {
            Some(existing) => *existing = decl,
            None => unique.push(decl),
        }
    }

    let results: Vec<(&SampleDeclaration, Result<SampleData, SampleError>)> = thread::scope(|scope| {
        let handles: Vec<_> = unique
            .iter()
            .map(|&decl| (decl, scope.spawn(move || load_one(decl, source, sample_rate))))
            .collect();

        handles
            .into_iter()
            .map(|(decl, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(SampleError::Fetch("loader thread panicked".to_string())));
                (decl, result)
            })
            .collect()
    });

    let mut report = LoadReport::default();
    for (decl, result) in results {
        match result {
            Ok(data) => {
                debug!(
                    "loaded sample '{}' ({:.2}s) from {}",
                    decl.name,
                    data.duration_secs(),
                    decl.url
                );
                report.bank.insert(decl.name.clone(), data);
            }
            Err(e) => {
                warn!("sample '{}' failed to load: {e}", decl.name);
                report.failed.push(decl.name.clone());
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn wav(samples: &[i16]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        buf.into_inner()
    }

    struct MapSource(HashMap<String, Vec<u8>>);

    impl SampleSource for MapSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, SampleError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| SampleError::Fetch(format!("{url}: HTTP 404 Not Found")))
        }
    }

    fn decl(name: &str, url: &str) -> SampleDeclaration {
        SampleDeclaration {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn partial_failure_keeps_the_rest() {
        let mut files = HashMap::new();
        files.insert("https://a/vox.wav".to_string(), wav(&[1000, -1000, 500]));
        files.insert("https://a/gong.wav".to_string(), wav(&[2000]));
        let source = MapSource(files);

        let report = load_samples(
            &[
                decl("vox", "https://a/vox.wav"),
                decl("missing", "https://a/missing.wav"),
                decl("gong", "https://a/gong.wav"),
                decl("broken", "https://a/vox.wav.txt"),
            ],
            &source,
            44100,
        );

        assert_eq!(report.failed, ["missing", "broken"]);
        assert_eq!(report.bank.len(), 2);
        assert_eq!(report.bank.get("vox").unwrap().len(), 3);
    }

    #[test]
    fn undecodable_bytes_fail_the_channel() {
        let mut files = HashMap::new();
        files.insert("https://a/page".to_string(), b"<html></html>".to_vec());
        let report = load_samples(&[decl("page", "https://a/page")], &MapSource(files), 44100);
        assert_eq!(report.failed, ["page"]);
        assert!(report.bank.is_empty());
    }

    #[test]
    fn later_duplicate_wins() {
        let mut files = HashMap::new();
        files.insert("https://a/one.wav".to_string(), wav(&[1]));
        files.insert("https://a/two.wav".to_string(), wav(&[1, 2]));
        let report = load_samples(
            &[decl("vox", "https://a/one.wav"), decl("vox", "https://a/two.wav")],
            &MapSource(files),
            44100,
        );
        assert!(report.failed.is_empty());
        assert_eq!(report.bank.get("vox").unwrap().len(), 2);
    }

    #[test]
    fn nothing_declared() {
        let report = load_samples(&[], &DefaultSource, 44100);
        assert!(report.bank.is_empty());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn default_source_reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clap.wav");
        std::fs::write(&path, wav(&[100, 200])).unwrap();

        let url = format!("file://{}", path.display());
        let report = load_samples(&[decl("myclap", &url)], &DefaultSource, 44100);
        assert!(report.failed.is_empty());
        assert_eq!(report.bank.get("myclap").unwrap().len(), 2);
    }

    #[test]
    fn default_source_errors() {
        assert!(matches!(
            DefaultSource.fetch("ftp://a/b.wav"),
            Err(SampleError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            DefaultSource.fetch("file:///definitely/not/here.wav"),
            Err(SampleError::Io(_))
        ));
    }
}
