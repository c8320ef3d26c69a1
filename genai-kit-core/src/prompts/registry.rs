use super::template::{Template, TemplateId, TemplateSource, parse_file_name};
use super::{PromptError, helpers};
use minijinja::Environment;
use parking_lot::RwLock;
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

type HelperSetup = Box<dyn Fn(&mut Environment<'static>) + Send + Sync>;

/// Builder for a [`PromptRegistry`].
pub struct RegistryBuilder {
    embedded: Vec<(String, String)>,
    override_dir: Option<PathBuf>,
    strict: bool,
    helper_setup: Vec<HelperSetup>,
}

impl RegistryBuilder {
    /// Registers an embedded template by file name and content.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let registry = PromptRegistry::builder()
    ///     .embed("greet@1.0.0.tmpl", include_str!("../prompts/greet@1.0.0.tmpl"))
    ///     .build()?;
    /// ```
    pub fn embed(mut self, file_name: impl Into<String>, content: impl Into<String>) -> Self {
        self.embedded.push((file_name.into(), content.into()));
        self
    }

    /// Sets the override directory. Files there shadow embedded templates
    /// with identical name and version.
    pub fn override_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_dir = Some(path.into());
        self
    }

    /// Disables the latest-version fallback: renders must name an exact
    /// version.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Registers custom helpers on the template environment.
    pub fn with_helpers(
        mut self,
        setup: impl Fn(&mut Environment<'static>) + Send + Sync + 'static,
    ) -> Self {
        self.helper_setup.push(Box::new(setup));
        self
    }

    /// Loads all templates and builds the registry.
    ///
    /// Embedded entries with invalid names or content fail the build;
    /// override files with problems are skipped with a warning.
    pub fn build(self) -> Result<PromptRegistry, PromptError> {
        let registry = PromptRegistry {
            state: RwLock::new(RegistryState {
                env: Environment::new(),
                templates: HashMap::new(),
            }),
            embedded: self.embedded,
            override_dir: self.override_dir,
            strict: self.strict,
            helper_setup: self.helper_setup,
        };
        let state = registry.load()?;
        *registry.state.write() = state;
        Ok(registry)
    }
}

struct RegistryState {
    env: Environment<'static>,
    templates: HashMap<String, BTreeMap<Version, Template>>,
}

/// Loads, version-resolves, fingerprints, and renders prompt templates.
///
/// Thread-safe: renders take a shared lock, [`PromptRegistry::reload`] takes
/// the exclusive lock, so readers keep rendering during everything short of
/// the swap itself.
///
/// # Example
///
/// ```
/// use genai_kit_core::prompts::PromptRegistry;
///
/// let registry = PromptRegistry::builder()
///     .embed("greet@1.0.0.tmpl", "Hello {{ name }}!")
///     .build()
///     .unwrap();
///
/// let (text, id) = registry
///     .render("greet", "", minijinja::context! { name => "world" })
///     .unwrap();
/// assert_eq!(text, "Hello world!");
/// assert_eq!(id.fingerprint.len(), 64);
/// ```
pub struct PromptRegistry {
    state: RwLock<RegistryState>,
    embedded: Vec<(String, String)>,
    override_dir: Option<PathBuf>,
    strict: bool,
    helper_setup: Vec<HelperSetup>,
}

impl PromptRegistry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            embedded: Vec::new(),
            override_dir: None,
            strict: false,
            helper_setup: Vec::new(),
        }
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        helpers::install(&mut env);
        for setup in &self.helper_setup {
            setup(&mut env);
        }
        env
    }

    fn load(&self) -> Result<RegistryState, PromptError> {
        let mut state = RegistryState {
            env: self.environment(),
            templates: HashMap::new(),
        };

        for (file_name, content) in &self.embedded {
            let (name, version) = parse_file_name(file_name)?;
            insert_template(
                &mut state,
                Template::new(name, version, content.clone(), TemplateSource::Embedded),
            )?;
        }

        if let Some(dir) = &self.override_dir {
            self.load_overrides(&mut state, dir)?;
        }

        Ok(state)
    }

    fn load_overrides(
        &self,
        state: &mut RegistryState,
        dir: &PathBuf,
    ) -> Result<(), PromptError> {
        if !dir.is_dir() {
            log::warn!("override directory {} does not exist", dir.display());
            return Ok(());
        }
        let entries = std::fs::read_dir(dir).map_err(|source| PromptError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("skipping unreadable directory entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(".tmpl") {
                continue;
            }
            let (name, version) = match parse_file_name(file_name) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("skipping override template: {e}");
                    continue;
                }
            };
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("skipping unreadable override {}: {e}", path.display());
                    continue;
                }
            };
            let template = Template::new(name, version, content, TemplateSource::Override);
            if let Err(e) = insert_template(state, template) {
                log::warn!("skipping override template: {e}");
            }
        }
        Ok(())
    }

    /// Renders a template with the given data.
    ///
    /// A non-empty `version` requires an exact match. An empty `version`
    /// resolves to the highest version by semantic ordering, unless the
    /// registry is strict. Returns the rendered text and the identity of
    /// the exact template bytes that produced it.
    pub fn render(
        &self,
        name: &str,
        version: &str,
        data: impl Serialize,
    ) -> Result<(String, TemplateId), PromptError> {
        let state = self.state.read();
        let template = resolve(&state, name, version, self.strict)?;
        let id = template.id();
        let key = template_key(&template.name, &template.version);
        let compiled = state
            .env
            .get_template(&key)
            .map_err(|source| PromptError::Render {
                name: id.name.clone(),
                version: id.version.to_string(),
                source,
            })?;
        let rendered = compiled.render(data).map_err(|source| PromptError::Render {
            name: id.name.clone(),
            version: id.version.to_string(),
            source,
        })?;
        Ok((rendered, id))
    }

    /// Fetches a template record by name and version (empty for latest).
    pub fn get(&self, name: &str, version: &str) -> Result<Template, PromptError> {
        let state = self.state.read();
        resolve(&state, name, version, self.strict).cloned()
    }

    /// Lists every loaded template, sorted by name then version.
    pub fn list(&self) -> Vec<TemplateId> {
        let state = self.state.read();
        let mut ids: Vec<TemplateId> = state
            .templates
            .values()
            .flat_map(|versions| versions.values().map(Template::id))
            .collect();
        ids.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        ids
    }

    /// Clears all override entries, rebuilds from embedded sources, and
    /// reloads the override directory.
    pub fn reload(&self) -> Result<(), PromptError> {
        let fresh = self.load()?;
        *self.state.write() = fresh;
        Ok(())
    }
}

fn template_key(name: &str, version: &Version) -> String {
    format!("{name}@{version}")
}

fn insert_template(state: &mut RegistryState, template: Template) -> Result<(), PromptError> {
    let key = template_key(&template.name, &template.version);
    state
        .env
        .add_template_owned(key, template.content.clone())
        .map_err(|source| PromptError::Parse {
            name: template.name.clone(),
            version: template.version.to_string(),
            source,
        })?;
    state
        .templates
        .entry(template.name.clone())
        .or_default()
        .insert(template.version.clone(), template);
    Ok(())
}

fn resolve<'a>(
    state: &'a RegistryState,
    name: &str,
    version: &str,
    strict: bool,
) -> Result<&'a Template, PromptError> {
    let not_found = || PromptError::NotFound {
        name: name.to_string(),
        version: if version.is_empty() {
            "latest".to_string()
        } else {
            version.to_string()
        },
    };

    let versions = state.templates.get(name).ok_or_else(not_found)?;
    if version.is_empty() {
        if strict {
            return Err(not_found());
        }
        return versions.last_key_value().map(|(_, t)| t).ok_or_else(not_found);
    }

    let parsed = Version::parse(version).map_err(|e| PromptError::InvalidFileName {
        file_name: format!("{name}@{version}"),
        message: format!("invalid version: {e}"),
    })?;
    versions.get(&parsed).ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_template(dir: &std::path::Path, file_name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(file_name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_exact_version_resolution() {
        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "v1: {{ name }}")
            .embed("greet@1.1.0.tmpl", "v1.1: {{ name }}")
            .build()
            .unwrap();

        let (text, id) = registry
            .render("greet", "1.0.0", minijinja::context! { name => "x" })
            .unwrap();
        assert_eq!(text, "v1: x");
        assert_eq!(id.version, Version::new(1, 0, 0));
    }

    #[test]
    fn test_empty_version_resolves_highest() {
        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "old")
            .embed("greet@2.0.0.tmpl", "new")
            .embed("greet@1.9.9.tmpl", "middle")
            .build()
            .unwrap();

        let (text, id) = registry
            .render("greet", "", minijinja::context! {})
            .unwrap();
        assert_eq!(text, "new");
        assert_eq!(id.version, Version::new(2, 0, 0));
    }

    #[test]
    fn test_strict_mode_disables_latest_fallback() {
        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "hi")
            .strict(true)
            .build()
            .unwrap();

        assert!(matches!(
            registry.render("greet", "", minijinja::context! {}),
            Err(PromptError::NotFound { .. })
        ));
        assert!(
            registry
                .render("greet", "1.0.0", minijinja::context! {})
                .is_ok()
        );
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let registry = PromptRegistry::builder().build().unwrap();
        assert!(matches!(
            registry.render("nope", "", minijinja::context! {}),
            Err(PromptError::NotFound { .. })
        ));
    }

    #[test]
    fn test_override_shadows_embedded_and_latest_picks_it() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "greet@2.0.0.tmpl", "override v2");

        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "embedded v1")
            .override_dir(dir.path())
            .build()
            .unwrap();

        // Latest resolves to the override.
        let (text, latest_id) = registry
            .render("greet", "", minijinja::context! {})
            .unwrap();
        assert_eq!(text, "override v2");

        // Exact fetch still reaches the embedded version.
        let (text, v1_id) = registry
            .render("greet", "1.0.0", minijinja::context! {})
            .unwrap();
        assert_eq!(text, "embedded v1");

        assert_ne!(latest_id.fingerprint, v1_id.fingerprint);
        assert_eq!(
            registry.get("greet", "2.0.0").unwrap().source,
            TemplateSource::Override
        );
        assert_eq!(
            registry.get("greet", "1.0.0").unwrap().source,
            TemplateSource::Embedded
        );
    }

    #[test]
    fn test_override_replaces_same_version() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "greet@1.0.0.tmpl", "shadowed");

        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "original")
            .override_dir(dir.path())
            .build()
            .unwrap();

        let (text, _) = registry
            .render("greet", "1.0.0", minijinja::context! {})
            .unwrap();
        assert_eq!(text, "shadowed");
    }

    #[test]
    fn test_reload_picks_up_new_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "embedded")
            .override_dir(dir.path())
            .build()
            .unwrap();

        assert_eq!(registry.list().len(), 1);

        write_template(dir.path(), "greet@3.0.0.tmpl", "late arrival");
        registry.reload().unwrap();

        assert_eq!(registry.list().len(), 2);
        let (text, _) = registry
            .render("greet", "", minijinja::context! {})
            .unwrap();
        assert_eq!(text, "late arrival");
    }

    #[test]
    fn test_reload_clears_stale_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "greet@9.0.0.tmpl", "stale");

        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "embedded")
            .override_dir(dir.path())
            .build()
            .unwrap();
        assert_eq!(registry.list().len(), 2);

        std::fs::remove_file(dir.path().join("greet@9.0.0.tmpl")).unwrap();
        registry.reload().unwrap();
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_bad_override_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "notes.txt", "ignored");
        write_template(dir.path(), "bad-name.tmpl", "ignored");
        write_template(dir.path(), "ok@1.0.0.tmpl", "loaded");

        let registry = PromptRegistry::builder()
            .override_dir(dir.path())
            .build()
            .unwrap();
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_bad_embedded_template_fails_build() {
        assert!(
            PromptRegistry::builder()
                .embed("broken", "whatever")
                .build()
                .is_err()
        );
        assert!(
            PromptRegistry::builder()
                .embed("broken@1.0.0.tmpl", "{{ unclosed")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "Hello {{ name | upper }}!")
            .build()
            .unwrap();

        let a = registry
            .render("greet", "", minijinja::context! { name => "ada" })
            .unwrap();
        let b = registry
            .render("greet", "", minijinja::context! { name => "ada" })
            .unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
        assert_eq!(a.0, "Hello ADA!");
    }

    #[test]
    fn test_custom_helpers() {
        let registry = PromptRegistry::builder()
            .embed("shout@1.0.0.tmpl", "{{ msg | shout }}")
            .with_helpers(|env| {
                env.add_filter("shout", |s: String| format!("{}!!!", s.to_uppercase()));
            })
            .build()
            .unwrap();

        let (text, _) = registry
            .render("shout", "", minijinja::context! { msg => "hey" })
            .unwrap();
        assert_eq!(text, "HEY!!!");
    }

    #[test]
    fn test_fingerprint_reflects_source_bytes() {
        let registry = PromptRegistry::builder()
            .embed("greet@1.0.0.tmpl", "same content")
            .embed("other@1.0.0.tmpl", "same content")
            .build()
            .unwrap();

        let a = registry.get("greet", "1.0.0").unwrap();
        let b = registry.get("other", "1.0.0").unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint, super::super::fingerprint(b"same content"));
    }
}
