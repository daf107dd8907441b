//! Instrument registry — capability table from channel name to instrument kind.
//!
//! Built-in instruments are fixed when the registry is created. Custom sample
//! channels come and go with the `<name>: <url>` declarations in the text and
//! are synchronised by [`Registry::reconcile`].

use std::collections::BTreeMap;

/// Channel every unprefixed line plays on.
pub const DEFAULT_INSTRUMENT: &str = "piano";

/// What kind of sound source backs a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Pitched,
    Percussion,
    CustomSample,
}

/// How many simultaneous voices the channel supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voicing {
    Poly,
    /// At most one voice; simultaneous events are deduplicated before scheduling.
    Mono,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub kind: InstrumentKind,
    pub label: String,
    pub voicing: Voicing,
    /// Resource locator for custom sample channels.
    pub url: Option<String>,
}

impl InstrumentSpec {
    fn builtin(kind: InstrumentKind, label: &str, voicing: Voicing) -> Self {
        Self {
            kind,
            label: label.to_string(),
            voicing,
            url: None,
        }
    }

    pub fn is_percussive(&self) -> bool {
        matches!(
            self.kind,
            InstrumentKind::Percussion | InstrumentKind::CustomSample
        )
    }
}

/// A `<name>: <url>` line registering a custom sample channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDeclaration {
    /// Lowercased channel name.
    pub name: String,
    pub url: String,
}

/// What changed during a [`Registry::reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Still declared, but pointing at a different URL.
    pub changed: Vec<String>,
    /// Declarations that tried to reuse a built-in name.
    pub rejected: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.rejected.is_empty()
    }
}

/// Name → capability table for one composition context.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: BTreeMap<String, InstrumentSpec>,
}

impl Registry {
    /// A registry holding only the built-in instruments.
    pub fn new() -> Self {
        use InstrumentKind::*;
        use Voicing::*;

        let builtins = [
            ("piano", Pitched, "Piano", Poly),
            ("lead", Pitched, "Lead", Mono),
            ("bass", Pitched, "Bass", Mono),
            ("pad", Pitched, "Pad", Poly),
            ("pluck", Pitched, "Pluck", Poly),
            ("kick", Percussion, "Kick", Poly),
            ("snare", Percussion, "Snare", Poly),
            ("hihat", Percussion, "Hi-hat", Poly),
            ("clap", Percussion, "Clap", Poly),
        ];

        let entries = builtins
            .into_iter()
            .map(|(name, kind, label, voicing)| {
                (name.to_string(), InstrumentSpec::builtin(kind, label, voicing))
            })
            .collect();

        Self { entries }
    }

    /// Look up a channel. Names are matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&InstrumentSpec> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|spec| spec.kind != InstrumentKind::CustomSample)
    }

    /// Register one custom sample channel. Built-in names cannot be taken.
    pub fn register_custom(&mut self, name: &str, url: &str) -> bool {
        let key = name.to_ascii_lowercase();
        if self.is_builtin(&key) {
            return false;
        }
        self.entries.insert(
            key.clone(),
            InstrumentSpec {
                kind: InstrumentKind::CustomSample,
                label: key,
                voicing: Voicing::Poly,
                url: Some(url.to_string()),
            },
        );
        true
    }

    /// Remove a custom channel. Built-ins are never removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        if self.is_builtin(&key) {
            return false;
        }
        self.entries.remove(&key).is_some()
    }

    /// Custom channels currently registered, sorted by name.
    pub fn custom_samples(&self) -> Vec<SampleDeclaration> {
        self.entries
            .iter()
            .filter_map(|(name, spec)| {
                spec.url.as_ref().map(|url| SampleDeclaration {
                    name: name.clone(),
                    url: url.clone(),
                })
            })
            .collect()
    }

    /// Bring the custom channels in line with the declarations in the current text.
    ///
    /// Customs no longer declared are pruned, new ones registered, and moved
    /// URLs updated. A later declaration of the same name wins.
    pub fn reconcile(&mut self, declared: &[SampleDeclaration]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let mut wanted: BTreeMap<String, &str> = BTreeMap::new();
        for decl in declared {
            let key = decl.name.to_ascii_lowercase();
            if self.is_builtin(&key) {
                if !report.rejected.contains(&key) {
                    report.rejected.push(key);
                }
                continue;
            }
            wanted.insert(key, decl.url.as_str());
        }

        let stale: Vec<String> = self
            .custom_samples()
            .into_iter()
            .map(|d| d.name)
            .filter(|name| !wanted.contains_key(name))
            .collect();
        for name in stale {
            self.entries.remove(&name);
            report.removed.push(name);
        }

        for (name, url) in wanted {
            match self.entries.get(&name).and_then(|s| s.url.as_deref()) {
                Some(existing) if existing == url => {}
                Some(_) => {
                    self.register_custom(&name, url);
                    report.changed.push(name);
                }
                None => {
                    self.register_custom(&name, url);
                    report.added.push(name);
                }
            }
        }

        report
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, url: &str) -> SampleDeclaration {
        SampleDeclaration {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn builtins_present() {
        let r = Registry::new();
        assert_eq!(r.get("piano").unwrap().kind, InstrumentKind::Pitched);
        assert_eq!(r.get("KICK").unwrap().kind, InstrumentKind::Percussion);
        assert_eq!(r.get("bass").unwrap().voicing, Voicing::Mono);
        assert!(r.contains(DEFAULT_INSTRUMENT));
        assert!(r.custom_samples().is_empty());
    }

    #[test]
    fn register_and_unregister_custom() {
        let mut r = Registry::new();
        assert!(r.register_custom("Vox", "https://example.com/vox.wav"));
        let spec = r.get("vox").unwrap();
        assert_eq!(spec.kind, InstrumentKind::CustomSample);
        assert!(spec.is_percussive());
        assert!(r.unregister("vox"));
        assert!(!r.contains("vox"));
    }

    #[test]
    fn builtin_names_cannot_be_overridden() {
        let mut r = Registry::new();
        assert!(!r.register_custom("piano", "https://example.com/p.wav"));
        assert!(!r.unregister("piano"));
        assert_eq!(r.get("piano").unwrap().kind, InstrumentKind::Pitched);
    }

    #[test]
    fn reconcile_adds_and_prunes() {
        let mut r = Registry::new();
        let first = r.reconcile(&[decl("vox", "https://a/vox.wav"), decl("gong", "https://a/gong.wav")]);
        assert_eq!(first.added, ["gong", "vox"]);
        assert!(first.removed.is_empty());

        let second = r.reconcile(&[decl("gong", "https://a/gong.wav")]);
        assert_eq!(second.removed, ["vox"]);
        assert!(second.added.is_empty());
        assert!(!r.contains("vox"));
        assert!(r.contains("gong"));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut r = Registry::new();
        let decls = [decl("vox", "https://a/vox.wav")];
        r.reconcile(&decls);
        assert!(r.reconcile(&decls).is_empty());
    }

    #[test]
    fn reconcile_tracks_url_changes_and_rejections() {
        let mut r = Registry::new();
        r.reconcile(&[decl("vox", "https://a/vox.wav")]);
        let report = r.reconcile(&[decl("vox", "https://b/vox.wav"), decl("snare", "https://b/s.wav")]);
        assert_eq!(report.changed, ["vox"]);
        assert_eq!(report.rejected, ["snare"]);
        assert_eq!(r.get("vox").unwrap().url.as_deref(), Some("https://b/vox.wav"));
    }
}
