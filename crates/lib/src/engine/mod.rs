//! Build orchestration.
//!
//! [`Builder`] ties the pipeline together. For each target it:
//!
//! 1. Short-circuits if the target is already built
//! 2. Resolves the language's environment and provisioned image
//! 3. Purges and stages the language's build directory
//! 4. Expands the build command and runs it in a disposable container
//! 5. Logs the toolchain's diagnostics
//! 6. Publishes the artifact and purges the build directory again
//! 7. Updates the target's state, payload list and invocation command
//!
//! Builds for one language share a single staging directory, so they are
//! serialized by a per-language mutex (and a lock file against other
//! processes). Different languages build concurrently.

mod types;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactStore, is_uuid4, resolve_name};
use crate::context::{BuildContext, StagingLock};
use crate::diagnostics::parse_diagnostics;
use crate::environment::{BuildEnvironment, BuilderConfig, LanguageFamily, Registry};
use crate::platform::host_user;
use crate::platform::paths::Layout;
use crate::provision::{ImageHandle, ProvisionReport, provision_image, refresh_image};
use crate::publish::publish;
use crate::runtime::{ContainerRuntime, ExitStatus, RunSpec};
use crate::target::{BuildStatus, BuildTarget, invocation_command, is_plain_file_name};
use crate::template::expand_with;

pub use types::*;

/// Languages the engine should be hooked for: those of every target that
/// carries inline source.
pub fn code_hook_languages<'a>(targets: impl IntoIterator<Item = &'a BuildTarget>) -> BTreeSet<String> {
  targets
    .into_iter()
    .filter(|t| t.has_code())
    .map(|t| t.language.clone())
    .collect()
}

pub struct Builder<R, A> {
  registry: Registry,
  layout: Layout,
  runtime: R,
  artifacts: A,
  images: RwLock<HashMap<String, ImageHandle>>,
  staging: HashMap<String, Mutex<()>>,
  timeout: Option<Duration>,
  retry: RetryPolicy,
  user: Option<String>,
}

impl<R: ContainerRuntime, A: ArtifactStore> Builder<R, A> {
  pub fn new(registry: Registry, layout: Layout, runtime: R, artifacts: A) -> Self {
    let staging = registry.iter().map(|(language, _)| (language.clone(), Mutex::new(()))).collect();
    Self {
      registry,
      layout,
      runtime,
      artifacts,
      images: RwLock::new(HashMap::new()),
      staging,
      timeout: None,
      retry: RetryPolicy::default(),
      user: host_user(),
    }
  }

  /// Build from a loaded environments file.
  pub fn from_config(config: &BuilderConfig, layout: Layout, runtime: R, artifacts: A) -> Self {
    Self::new(Registry::from(config), layout, runtime, artifacts)
      .with_timeout(config.timeout)
      .with_retry(RetryPolicy::new(config.max_attempts))
  }

  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_user(mut self, user: Option<String>) -> Self {
    self.user = user;
    self
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  pub fn runtime(&self) -> &R {
    &self.runtime
  }

  fn context(&self, language: &str) -> BuildContext {
    BuildContext::new(language, self.layout.build_dir(language))
  }

  /// Prepare every enabled language: build directory plus local image.
  ///
  /// A language whose image cannot be obtained stays unusable; the others
  /// are unaffected.
  pub async fn provision(&self) -> ProvisionReport {
    let mut report = ProvisionReport::default();

    for (language, env) in self.registry.iter() {
      if let Err(e) = self.context(language).ensure().await {
        error!(language = %language, error = %e, "failed to create build directory");
        report.failed.insert(language.clone(), e.to_string());
        continue;
      }

      match provision_image(&self.runtime, &env.image).await {
        Ok(handle) => {
          info!(language = %language, image = %handle, "build environment ready");
          self.images.write().await.insert(language.clone(), handle.clone());
          report.ready.insert(language.clone(), handle);
        }
        Err(e) => {
          error!(language = %language, image = %env.image, error = %e, "failed to provision image");
          report.failed.insert(language.clone(), e.to_string());
        }
      }
    }
    report
  }

  /// Like [`provision`](Self::provision), but pulls every image even when a
  /// local copy exists. Each image is pulled exactly once.
  pub async fn refresh(&self) -> ProvisionReport {
    let mut report = ProvisionReport::default();

    for (language, _) in self.registry.iter() {
      match self.reprovision(language).await {
        Ok(handle) => {
          report.ready.insert(language.clone(), handle);
        }
        Err(e) => {
          error!(language = %language, error = %e, "failed to refresh image");
          report.failed.insert(language.clone(), e.to_string());
        }
      }
    }
    report
  }

  /// Pull a language's image again and replace the cached handle.
  pub async fn reprovision(&self, language: &str) -> Result<ImageHandle, BuildError> {
    let env = self
      .registry
      .resolve(language)
      .ok_or_else(|| BuildError::UnknownLanguage(language.to_string()))?;

    self.context(language).ensure().await?;
    let handle = refresh_image(&self.runtime, &env.image).await?;
    self.images.write().await.insert(language.to_string(), handle.clone());
    Ok(handle)
  }

  /// The environment for a language, if it is configured and provisioned.
  pub async fn resolve_environment(&self, language: &str) -> Option<(&BuildEnvironment, ImageHandle)> {
    let env = self.registry.resolve(language)?;
    let image = self.images.read().await.get(language).cloned()?;
    Some((env, image))
  }

  /// Build a target unless it is already built.
  ///
  /// Container runtime failures and build target names that are not plain
  /// file names are returned as errors; everything else is reported in the
  /// outcome and recorded on the target.
  pub async fn ensure_built(&self, target: &mut BuildTarget) -> Result<BuildOutcome, BuildError> {
    if target.is_built() {
      return Ok(BuildOutcome::AlreadyBuilt);
    }
    if !is_plain_file_name(&target.build_target) {
      return Err(BuildError::InvalidBuildTarget(target.build_target.clone()));
    }

    let Some((env, image)) = self.resolve_environment(&target.language).await else {
      if !target.state.build_error {
        error!(target = %target.id, language = %target.language, "no build environment configured");
        target.state.build_error = true;
      }
      return Ok(BuildOutcome::EnvironmentMissing);
    };

    let attempts = target.attempts();
    if !self.retry.allows(attempts) {
      debug!(target = %target.id, attempts, "retry budget exhausted, not rebuilding");
      return Ok(BuildOutcome::RetriesExhausted { attempts });
    }

    let family = env.family_for(&target.language);
    let Some(payload) = self.run_build(env, family, &image, target).await? else {
      let attempts = attempts + 1;
      target.status = BuildStatus::Failed { attempts };
      warn!(
        target = %target.id,
        language = %target.language,
        artifact = %target.build_target,
        attempts,
        "build produced no artifact"
      );
      return Ok(BuildOutcome::Failed { attempts });
    };

    target.state.built = true;
    target.state.build_error = false;
    target.status = BuildStatus::Built;
    self.drop_consumed_dependencies(family, target);

    if target.command.is_none() {
      target.command = Some(invocation_command(&target.build_target));
    }
    if !target.payloads.contains(&target.build_target) {
      target.payloads.push(target.build_target.clone());
    }

    info!(target = %target.id, language = %target.language, payload = %payload.display(), "build complete");
    Ok(BuildOutcome::Built { payload })
  }

  /// Run `ensure_built` over every target carrying inline source.
  pub async fn build_all(&self, targets: &mut [BuildTarget]) -> Vec<(String, Result<BuildOutcome, BuildError>)> {
    let mut results = Vec::new();
    for target in targets.iter_mut().filter(|t| t.has_code()) {
      let outcome = self.ensure_built(target).await;
      results.push((target.id.clone(), outcome));
    }
    results
  }

  /// One purge-to-purge cycle under the language's locks.
  async fn run_build(
    &self,
    env: &BuildEnvironment,
    family: LanguageFamily,
    image: &ImageHandle,
    target: &BuildTarget,
  ) -> Result<Option<PathBuf>, BuildError> {
    let language = target.language.as_str();
    let _staging = match self.staging.get(language) {
      Some(mutex) => mutex.lock().await,
      None => return Err(BuildError::UnknownLanguage(language.to_string())),
    };
    let _file_lock = StagingLock::acquire(&self.layout.build_lock_path(language), language)?;

    let context = self.context(language);
    context.ensure().await?;
    context.purge().await?;

    let built = self.stage_and_run(&context, env, family, image, target).await;
    let purged = context.purge().await;
    let published = built?;
    purged?;
    Ok(published)
  }

  async fn stage_and_run(
    &self,
    context: &BuildContext,
    env: &BuildEnvironment,
    family: LanguageFamily,
    image: &ImageHandle,
    target: &BuildTarget,
  ) -> Result<Option<PathBuf>, BuildError> {
    let language = context.language();
    let staged = context.stage(env, family, target, &self.artifacts).await?;
    let command = expand_with(env, family, &target.build_target, &staged.dependencies);

    let spec = RunSpec {
      image: image.id.clone(),
      name: container_name(language),
      working_dir: env.working_dir.clone(),
      host_dir: dunce::canonicalize(context.dir())?,
      command,
      user: self.user.clone(),
    };
    info!(target = %target.id, language = %language, command = %spec.command, "running build container");

    let exit = self.runtime.run(&spec, self.timeout).await?;
    match exit.status {
      ExitStatus::Exited(code) => {
        info!(target = %target.id, language = %language, ?code, duration = ?exit.duration, "container exited");
      }
      ExitStatus::TimedOut => {
        warn!(target = %target.id, language = %language, duration = ?exit.duration, "container timed out");
        // Whatever the toolchain wrote before the kill may be partial.
        parse_diagnostics(context.dir(), language, family).await;
        return Ok(None);
      }
    }

    parse_diagnostics(context.dir(), language, family).await;

    Ok(publish(context.dir(), &self.layout.payloads_dir(), &target.build_target).await?)
  }

  /// Strip build-time-only inputs from the payload list.
  fn drop_consumed_dependencies(&self, family: LanguageFamily, target: &mut BuildTarget) {
    let artifacts = &self.artifacts;
    target.payloads.retain(|entry| {
      let consumed = if is_uuid4(entry) {
        resolve_name(artifacts, entry).is_some_and(|name| family.is_dependency(&name))
      } else {
        family.is_dependency(entry)
      };
      !consumed
    });
  }
}

/// A unique, engine-safe container name for one build.
fn container_name(language: &str) -> String {
  let safe: String = language
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' { c } else { '-' })
    .collect();
  format!("builder-{safe}-{}", Uuid::new_v4().simple())
}
