//! Mode selection and per-entry reporting.
//!
//! Batch mode never stops on a single entry: unresolved entries and failed
//! operations are printed and the next entry runs. Single-shot mode turns
//! any failure into an error for the caller.

use crate::config::load_batch;
use crate::error::EntryError;
use crate::family::FamilyFactory;
use crate::render::{banner, render_text_report};
use crate::runner::{OperationRunner, Pause};
use crate::spec::{DescriptorBuilder, OperationDescriptor, parse_attributes};

use std::io::Write;
use std::path::{Path, PathBuf};

/// How the dispatcher was invoked.
#[derive(Debug, Clone)]
pub enum Invocation {
    SingleShot(SingleShotParams),
    Batch(PathBuf),
}

/// Operation parameters given directly on the command line.
#[derive(Debug, Clone, Default)]
pub struct SingleShotParams {
    pub spec: PathBuf,
    pub schema: Option<PathBuf>,
    pub no_schema: bool,
    pub json: Option<String>,
    pub request: Option<String>,
    pub enumerate: Option<String>,
    pub sleep: Option<u64>,
    pub subscribe: Option<String>,
}

impl SingleShotParams {
    pub fn into_descriptor(self) -> anyhow::Result<OperationDescriptor> {
        if !self.spec.is_file() {
            return Err(EntryError::MissingSpecFile { path: self.spec }.into());
        }

        let mut builder = DescriptorBuilder::new(self.spec);
        if self.no_schema {
            builder = builder.no_schema(true);
        }
        if let Some(schema) = self.schema {
            builder = builder.schema(schema);
        }
        if let Some(op) = self.request {
            builder = builder.request(op);
        }
        if let Some(op) = self.enumerate {
            builder = builder.enumerate(op);
        }
        if let Some(topic) = self.subscribe {
            builder = builder.subscribe(topic);
        }
        if let Some(seconds) = self.sleep {
            builder = builder.delay_seconds(seconds);
        }
        if let Some(text) = self.json {
            let attrs = parse_attributes(&text)
                .map_err(|err| anyhow::anyhow!("invalid --json payload: {err}"))?;
            builder = builder.attributes(attrs);
        }

        Ok(builder.build())
    }
}

/// Counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub entries: usize,
    pub executed: usize,
    pub failed: usize,
}

pub struct Dispatcher<'a, F, P, W, E> {
    runner: OperationRunner<'a, F, P>,
    stdout: &'a mut W,
    stderr: &'a mut E,
}

impl<'a, F, P, W, E> Dispatcher<'a, F, P, W, E>
where
    F: FamilyFactory,
    P: Pause,
    W: Write,
    E: Write,
{
    pub fn new(factory: &'a F, pause: &'a P, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            runner: OperationRunner::new(factory, pause),
            stdout,
            stderr,
        }
    }

    pub fn dispatch(&mut self, invocation: Invocation) -> anyhow::Result<()> {
        match invocation {
            Invocation::SingleShot(params) => self.single_shot(params),
            Invocation::Batch(path) => {
                let summary = self.batch(&path)?;
                tracing::info!(
                    entries = summary.entries,
                    executed = summary.executed,
                    failed = summary.failed,
                    "batch finished"
                );
                Ok(())
            }
        }
    }

    fn single_shot(&mut self, params: SingleShotParams) -> anyhow::Result<()> {
        let descriptor = params.into_descriptor()?;
        let report = self.runner.run(&descriptor)?;

        self.stdout
            .write_all(render_text_report(&report)?.as_bytes())?;

        let mut failures = report.failures.into_iter();
        if let Some(first) = failures.next() {
            for other in failures {
                writeln!(self.stderr, "error: {other}")?;
            }
            return Err(first.into());
        }
        Ok(())
    }

    /// Run every entry of the batch config at `path` in document order.
    pub fn batch(&mut self, path: &Path) -> anyhow::Result<BatchSummary> {
        let batch = load_batch(path)?;
        tracing::debug!(
            config = %path.display(),
            directory = %batch.registry.directory().display(),
            specs = batch.registry.names().count(),
            entries = batch.entries.len(),
            "batch configuration loaded"
        );

        let mut summary = BatchSummary {
            entries: batch.entries.len(),
            ..BatchSummary::default()
        };

        for entry in batch.entries {
            self.stdout.write_all(banner(&entry.name).as_bytes())?;

            let descriptor = match entry.outcome {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    writeln!(self.stderr, "error: {err}")?;
                    summary.failed += 1;
                    continue;
                }
            };

            summary.executed += 1;
            match self.runner.run(&descriptor) {
                Ok(report) => {
                    self.stdout
                        .write_all(render_text_report(&report)?.as_bytes())?;
                    for failure in &report.failures {
                        tracing::warn!(entry = %entry.name, error = %failure, "operation failed");
                        writeln!(self.stderr, "error: entry '{}': {failure}", entry.name)?;
                    }
                    if !report.is_success() {
                        summary.failed += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(entry = %entry.name, error = %err, "operation failed");
                    writeln!(self.stderr, "error: entry '{}': {err}", entry.name)?;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::runner::RunError;
    use crate::runner::tests::{CallLog, RecordingFactory, RecordingPause};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Captured {
        result: anyhow::Result<()>,
        stdout: String,
        stderr: String,
        calls: Vec<String>,
    }

    fn dispatch_with(factory: &RecordingFactory, invocation: Invocation) -> Captured {
        let pause = RecordingPause {
            log: Rc::clone(&factory.log),
        };
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let result =
            Dispatcher::new(factory, &pause, &mut stdout, &mut stderr).dispatch(invocation);
        Captured {
            result,
            stdout: String::from_utf8(stdout).unwrap(),
            stderr: String::from_utf8(stderr).unwrap(),
            calls: factory.log.borrow().clone(),
        }
    }

    fn batch_fixture(
        spec_files: &[&str],
        doc: impl FnOnce(&Path) -> Value,
    ) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        fs::create_dir(&specs).unwrap();
        for name in spec_files {
            fs::write(specs.join(name), "name: test\n").unwrap();
        }
        let config = dir.path().join("config.json");
        fs::write(&config, doc(&specs).to_string()).unwrap();
        (dir, config)
    }

    #[test]
    fn batch_runs_resolved_entries_and_reports_the_rest() {
        let (_dir, config) = batch_fixture(&["foo.yaml"], |specs| {
            json!({
                "yaml-specs-path": specs,
                "spec-args": {
                    "a": {"spec": "foo.yaml", "do": "get", "json-params": {"id": 1}},
                    "b": {"spec": "missing.yaml", "do": "get"},
                    "foo.yaml": {"dump": "list"}
                }
            })
        });
        let log = CallLog::default();
        let factory = RecordingFactory::new(&log);

        let out = dispatch_with(&factory, Invocation::Batch(config));

        assert!(out.result.is_ok());
        let inits = out.calls.iter().filter(|c| c.starts_with("init ")).count();
        assert_eq!(inits, 2);
        assert!(out.calls.iter().any(|c| c == r#"request get {"id":1}"#));
        assert!(out.calls.iter().any(|c| c == "enumerate list {}"));

        let banners: Vec<&str> = out
            .stdout
            .lines()
            .filter(|l| l.starts_with("###"))
            .collect();
        assert_eq!(
            banners,
            vec![
                "############### a ###############",
                "############### b ###############",
                "############### foo.yaml ###############",
            ]
        );
        assert_eq!(out.stderr.lines().count(), 1);
        assert!(out.stderr.contains("entry 'b': no specification file 'missing.yaml'"));
    }

    #[test]
    fn batch_summary_counts_failures() {
        let (_dir, config) = batch_fixture(&["foo.yaml", "bar.yaml"], |specs| {
            json!({
                "yaml-specs-path": specs,
                "spec-args": {
                    "foo.yaml": {"do": "get"},
                    "bar.yaml": {"do": "get"},
                    "gone.yaml": {}
                }
            })
        });
        let log = CallLog::default();
        let mut factory = RecordingFactory::new(&log);
        factory.faults.request = true;
        let pause = RecordingPause {
            log: Rc::clone(&log),
        };
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        let summary = Dispatcher::new(&factory, &pause, &mut stdout, &mut stderr)
            .batch(&config)
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                entries: 3,
                executed: 2,
                failed: 3,
            }
        );
        let stderr = String::from_utf8(stderr).unwrap();
        assert!(stderr.contains("error: entry 'foo.yaml': request 'get' failed"));
        assert!(stderr.contains("error: entry 'bar.yaml': request 'get' failed"));
    }

    #[test]
    fn construction_failure_does_not_stop_the_batch() {
        let (_dir, config) = batch_fixture(&["foo.yaml", "bar.yaml"], |specs| {
            json!({
                "yaml-specs-path": specs,
                "spec-args": {
                    "foo.yaml": {"do": "get"},
                    "bar.yaml": {"dump": "list"}
                }
            })
        });
        let log = CallLog::default();
        let mut factory = RecordingFactory::new(&log);
        factory.faults.construct = true;

        let out = dispatch_with(&factory, Invocation::Batch(config));

        assert!(out.result.is_ok());
        let inits = out.calls.iter().filter(|c| c.starts_with("init ")).count();
        assert_eq!(inits, 2);
        assert_eq!(out.calls.len(), 2);
        assert!(out.stdout.contains("############### foo.yaml ###############"));
        assert!(out.stdout.contains("############### bar.yaml ###############"));
        let errors: Vec<&str> = out.stderr.lines().collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("error: entry 'foo.yaml': failed to construct family"));
        assert!(errors[1].starts_with("error: entry 'bar.yaml': failed to construct family"));
    }

    #[test]
    fn invalid_batch_document_runs_nothing() {
        let (_dir, config) = batch_fixture(&["foo.yaml"], |specs| {
            json!({"yaml-specs-path": specs, "spec-args": {"foo.yaml": {"sleep": "soon"}}})
        });
        let log = CallLog::default();
        let factory = RecordingFactory::new(&log);

        let out = dispatch_with(&factory, Invocation::Batch(config));

        let err = out.result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Validation { .. })
        ));
        assert!(err.to_string().contains(r#"$.spec-args["foo.yaml"].sleep"#));
        assert!(out.calls.is_empty());
        assert_eq!(out.stdout, "");
    }

    #[test]
    fn single_shot_runs_one_descriptor() {
        let dir = TempDir::new().unwrap();
        let spec = dir.path().join("foo.yaml");
        fs::write(&spec, "name: foo\n").unwrap();
        let log = CallLog::default();
        let factory = RecordingFactory::new(&log);

        let params = SingleShotParams {
            spec: spec.clone(),
            schema: Some(PathBuf::from("s.yaml")),
            no_schema: true,
            json: Some(r#"{"id": 1}"#.to_string()),
            request: Some("get".to_string()),
            subscribe: Some("mgmt".to_string()),
            sleep: Some(1),
            ..SingleShotParams::default()
        };
        let out = dispatch_with(&factory, Invocation::SingleShot(params));

        assert!(out.result.is_ok());
        assert_eq!(
            out.calls,
            vec![
                format!(r#"init {} NamedSchema("s.yaml")"#, spec.display()),
                "subscribe mgmt".to_string(),
                "pause 1".to_string(),
                r#"request get {"id":1}"#.to_string(),
                "drain".to_string(),
            ]
        );
        assert!(out.stdout.contains("\"reply-to\": \"get\""));
    }

    #[test]
    fn single_shot_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let spec = dir.path().join("foo.yaml");
        fs::write(&spec, "name: foo\n").unwrap();
        let log = CallLog::default();
        let mut factory = RecordingFactory::new(&log);
        factory.faults.request = true;

        let params = SingleShotParams {
            spec,
            request: Some("get".to_string()),
            ..SingleShotParams::default()
        };
        let out = dispatch_with(&factory, Invocation::SingleShot(params));

        let err = out.result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::Request { .. })
        ));
    }

    #[test]
    fn single_shot_requires_existing_spec() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let factory = RecordingFactory::new(&log);

        let params = SingleShotParams {
            spec: dir.path().join("absent.yaml"),
            request: Some("get".to_string()),
            ..SingleShotParams::default()
        };
        let out = dispatch_with(&factory, Invocation::SingleShot(params));

        let err = out.result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EntryError>(),
            Some(EntryError::MissingSpecFile { .. })
        ));
        assert!(out.calls.is_empty());
    }

    #[test]
    fn single_shot_rejects_non_object_payload() {
        let dir = TempDir::new().unwrap();
        let spec = dir.path().join("foo.yaml");
        fs::write(&spec, "name: foo\n").unwrap();
        let log = CallLog::default();
        let factory = RecordingFactory::new(&log);

        let params = SingleShotParams {
            spec,
            json: Some("[1, 2]".to_string()),
            ..SingleShotParams::default()
        };
        let out = dispatch_with(&factory, Invocation::SingleShot(params));

        let err = out.result.unwrap_err();
        assert!(format!("{err:#}").contains("invalid --json payload"));
        assert!(out.calls.is_empty());
    }
}
