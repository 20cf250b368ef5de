//! Command-line interface for the control naming tool

use crate::error::{Error, Result};
use crate::{process_document, Options, ProcessOutcome, DESCRIPTION, NAME, VERSION};
use clap::{Arg, ArgAction, Command, ValueEnum};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json, // Structured change log alongside the document
}

/// Option defaults loadable from a `--config` file; explicit CLI flags win.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    display_mode: Option<bool>,
    content_language: Option<bool>,
    content_language_value: Option<String>,
    parent_display: Option<bool>,
    card_enhancement: Option<bool>,
    data_source_fix: Option<bool>,
    data_source_name: Option<String>,
    reference_update: Option<bool>,
}

/// Built-in demo document, also used as a fixture by the tests.
pub const SAMPLE_DOCUMENT: &str = r#"- Form1:
    Control: Form@2.4.2
    Layout: Vertical
    Properties:
      BorderColor: =RGBA(0, 18, 107, 1)
      DataSource: =Employee_Info
      X: =40
      Y: =40
    Children:
      - Name_DataCard1:
          Control: TypedDataCard@1.0.6
          Variant: TextualEdit
          IsLocked: true
          Properties:
            BorderColor: =RGBA(0, 18, 107, 1)
            DataField: ="Name"
            Default: =ThisItem.Name
            DisplayName: =DataSourceInfo([@Employee_Info],DataSourceInfo.DisplayName,'Name')
            MaxLength: =DataSourceInfo([@Employee_Info], DataSourceInfo.MaxLength, 'Name')
            Required: =true
            Update: =DataCardValue1.Value
            Width: =266
            Y: =0
          Children:
            - DataCardKey1:
                Control: Text@0.0.50
                Properties:
                  Height: =22
                  Text: =Parent.DisplayName
                  Weight: ='TextCanvas.Weight'.Semibold
                  Width: =Parent.Width - 48
                  Wrap: =false
                  X: =24
                  Y: =10
            - DataCardValue1:
                Control: TextInput@0.0.53
                Properties:
                  AccessibleLabel: =Parent.DisplayName
                  DisplayMode: =Parent.DisplayMode
                  Mode: ="'TextInputCanvas.Mode'.TextInputModeSingleLine"
                  Required: =Parent.Required
                  ValidationState: =If(IsBlank(Parent.Error), "None", "Error")
                  Value: =Parent.Default
                  Width: =Parent.Width - 48
                  X: =24
                  Y: =DataCardKey1.Y + DataCardKey1.Height + 4
"#;

/// Two-card variant exercising sibling field contexts.
pub const SAMPLE_CARDS_DOCUMENT: &str = r#"- Form1:
    Control: Form@2.4.2
    Properties:
      DataSource: =Employee_Info
    Children:
      - EmployeeData_Card:
          Control: TypedDataCard@1.0.6
          Properties:
            DataField: ="EmployeeData"
            Required: =true
          Children:
            - DataCardKey1:
                Control: Text@0.0.50
                Properties:
                  Text: ="Key"
            - DataCardValue1:
                Control: TextInput@0.0.53
                Properties:
                  Value: =""
      - PhoneNumber_Card:
          Control: TypedDataCard@1.0.6
          Properties:
            DataField: ="PhoneNumber"
            Required: =false
          Children:
            - DataCardKey2:
                Control: Text@0.0.50
                Properties:
                  Text: ="Phone"
            - DataCardValue2:
                Control: TextInput@0.0.53
                Properties:
                  Value: =""
"#;

pub struct Cli {
    config: ConfigFile,
    start_time: Instant,
}

impl Cli {
    pub fn new() -> Self {
        Self {
            config: ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();

        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.load_config_file(config_path)?;
        }

        let verbose = matches.get_count("verbose");
        self.setup_logging(verbose);

        match matches.subcommand() {
            Some(("fix", sub_matches)) => self.handle_fix_command(sub_matches),
            Some(("check", sub_matches)) => self.handle_check_command(sub_matches),
            Some(("sample", sub_matches)) => self.handle_sample_command(sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        }
    }

    fn build_cli(&self) -> Command {
        Command::new(NAME)
            .version(VERSION)
            .about(DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.toml or .json)")
                    .action(ArgAction::Set)
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count)
            )
            .subcommand(
                Command::new("fix")
                    .about("Rename controls and tidy properties in a document")
                    .arg(
                        Arg::new("input")
                            .help("Input YAML file")
                            .required(true)
                            .index(1)
                    )
                    .arg(
                        Arg::new("output")
                            .short('o')
                            .long("output")
                            .value_name("FILE")
                            .help("Output file (defaults to stdout)")
                    )
                    .arg(
                        Arg::new("format")
                            .short('f')
                            .long("format")
                            .value_parser(clap::value_parser!(OutputFormat))
                            .default_value("yaml")
                            .help("Output format")
                    )
                    .arg(
                        Arg::new("display-mode")
                            .long("display-mode")
                            .help("Fill in DisplayMode expressions by control family")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("content-language")
                            .long("content-language")
                            .help("Fill in ContentLanguage on text controls")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("language")
                            .long("language")
                            .value_name("CODE")
                            .help("Language code for --content-language")
                    )
                    .arg(
                        Arg::new("parent-display")
                            .long("parent-display")
                            .help("Point card labels at Parent.DisplayName")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("card-enhancements")
                            .long("card-enhancements")
                            .help("Fill in card UX properties (hints, tooltips, validation styling)")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("fix-data-source")
                            .long("fix-data-source")
                            .help("Normalize [@DataSource] reference tokens")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("data-source")
                            .long("data-source")
                            .value_name("NAME")
                            .help("Target identifier for --fix-data-source")
                    )
                    .arg(
                        Arg::new("no-reference-update")
                            .long("no-reference-update")
                            .help("Skip rewriting expression references to renamed controls")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("stats")
                            .long("stats")
                            .help("Show detailed processing statistics")
                            .action(ArgAction::SetTrue)
                    )
                    .arg(
                        Arg::new("watch")
                            .short('w')
                            .long("watch")
                            .help("Watch the input file and reprocess on change")
                            .action(ArgAction::SetTrue)
                    )
            )
            .subcommand(
                Command::new("check")
                    .about("Check that a document parses and report its control count")
                    .arg(
                        Arg::new("input")
                            .help("Input YAML file")
                            .required(true)
                            .index(1)
                    )
            )
            .subcommand(
                Command::new("sample")
                    .about("Print a built-in sample document to try the tool on")
                    .arg(
                        Arg::new("cards")
                            .long("cards")
                            .help("Print the two-card variant instead")
                            .action(ArgAction::SetTrue)
                    )
            )
    }

    fn setup_logging(&self, verbose_count: u8) {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
    }

    fn load_config_file(&mut self, config_path: &str) -> Result<()> {
        let config_content =
            fs::read_to_string(config_path).map_err(|e| Error::FileNotFound {
                path: format!("Config file {}: {}", config_path, e),
            })?;

        self.config = if config_path.ends_with(".json") {
            serde_json::from_str(&config_content).map_err(|e| {
                Error::invalid_format(format!("Invalid JSON config: {}", e))
            })?
        } else if config_path.ends_with(".toml") {
            toml::from_str(&config_content).map_err(|e| {
                Error::invalid_format(format!("Invalid TOML config: {}", e))
            })?
        } else {
            return Err(Error::invalid_format(
                "Config file must be .json or .toml format",
            ));
        };

        log::info!("Loaded configuration from {}", config_path);
        Ok(())
    }

    /// Merge precedence: built-in defaults, then config file, then flags.
    fn build_options(&self, matches: &clap::ArgMatches) -> Options {
        let mut options = Options::default();

        if let Some(value) = self.config.display_mode {
            options.display_mode = value;
        }
        if let Some(value) = self.config.content_language {
            options.content_language = value;
        }
        if let Some(value) = &self.config.content_language_value {
            options.content_language_value = value.clone();
        }
        if let Some(value) = self.config.parent_display {
            options.parent_display = value;
        }
        if let Some(value) = self.config.card_enhancement {
            options.card_enhancement = value;
        }
        if let Some(value) = self.config.data_source_fix {
            options.data_source_fix = value;
        }
        if let Some(value) = &self.config.data_source_name {
            options.data_source_name = value.clone();
        }
        if let Some(value) = self.config.reference_update {
            options.reference_update = value;
        }

        if matches.get_flag("display-mode") {
            options.display_mode = true;
        }
        if matches.get_flag("content-language") {
            options.content_language = true;
        }
        if let Some(code) = matches.get_one::<String>("language") {
            options.content_language_value = code.clone();
        }
        if matches.get_flag("parent-display") {
            options.parent_display = true;
        }
        if matches.get_flag("card-enhancements") {
            options.card_enhancement = true;
        }
        if matches.get_flag("fix-data-source") {
            options.data_source_fix = true;
        }
        if let Some(name) = matches.get_one::<String>("data-source") {
            options.data_source_name = name.clone();
        }
        if matches.get_flag("no-reference-update") {
            options.reference_update = false;
        }

        options
    }

    fn handle_fix_command(&self, matches: &clap::ArgMatches) -> Result<()> {
        let input_path = matches.get_one::<String>("input").unwrap();
        let output_path = matches.get_one::<String>("output");
        let format = matches.get_one::<OutputFormat>("format").unwrap();
        let show_stats = matches.get_flag("stats");

        let options = self.build_options(matches);

        if matches.get_flag("watch") {
            self.watch_and_fix(input_path, output_path, &options, format)
        } else {
            let outcome = self.fix_single_file(input_path, output_path, &options, format)?;
            self.print_summary(&outcome, output_path.is_none());
            if show_stats {
                self.print_stats(&outcome);
            }
            Ok(())
        }
    }

    fn fix_single_file(
        &self,
        input_path: &str,
        output_path: Option<&String>,
        options: &Options,
        format: &OutputFormat,
    ) -> Result<ProcessOutcome> {
        let text = fs::read_to_string(input_path).map_err(|_| Error::FileNotFound {
            path: input_path.to_string(),
        })?;

        let outcome = process_document(&text, options)?;

        let rendered = match format {
            OutputFormat::Yaml => outcome.yaml.clone(),
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "yaml": &outcome.yaml,
                "changeLog": &outcome.change_log,
                "nameTable": &outcome.name_table,
                "referenceUpdates": &outcome.reference_updates,
            }))
            .map_err(|e| Error::invalid_format(e.to_string()))?,
        };

        match output_path {
            Some(path) => fs::write(path, &rendered)?,
            None => print!("{}", rendered),
        }

        Ok(outcome)
    }

    /// Change-log summary, one line per control. Written to stderr when the
    /// document itself went to stdout.
    fn print_summary(&self, outcome: &ProcessOutcome, document_on_stdout: bool) {
        let mut emit = |line: String| {
            if document_on_stdout {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        };

        emit(format!("{} control(s) changed", outcome.change_log.len()));
        for entry in &outcome.change_log {
            let mut line = format!(
                "  {} -> {} [{}]",
                entry.original, entry.fixed, entry.control_type
            );
            if !entry.property_changes.is_empty() {
                line.push_str(&format!(" ({})", entry.property_changes.join(", ")));
            }
            emit(line);
        }
    }

    fn print_stats(&self, outcome: &ProcessOutcome) {
        let elapsed = self.start_time.elapsed();
        let property_changes: usize = outcome
            .change_log
            .iter()
            .map(|e| e.property_changes.len())
            .sum();

        eprintln!("Renames:            {}", outcome.name_table.len());
        eprintln!("Property changes:   {}", property_changes);
        eprintln!("Expressions fixed:  {}", outcome.reference_updates.len());
        for update in &outcome.reference_updates {
            eprintln!("  {}: {}", update.context, update.detail);
        }
        eprintln!("Time:               {:.1}ms", elapsed.as_secs_f64() * 1000.0);
    }

    fn watch_and_fix(
        &self,
        input_path: &str,
        output_path: Option<&String>,
        options: &Options,
        format: &OutputFormat,
    ) -> Result<()> {
        println!("Watching {} for changes...", input_path);

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(e) = tx.send(event) {
                        eprintln!("Watch error: {}", e);
                    }
                }
                Err(e) => eprintln!("Watch error: {}", e),
            },
            notify::Config::default(),
        )
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create file watcher: {}", e),
            ))
        })?;

        watcher
            .watch(Path::new(input_path), RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to watch file: {}", e),
                ))
            })?;

        // Initial run
        match self.fix_single_file(input_path, output_path, options, format) {
            Ok(outcome) => println!("Processed: {} control(s) changed", outcome.change_log.len()),
            Err(e) => eprintln!("Initial processing failed: {}", e),
        }

        loop {
            match rx.recv() {
                Ok(_event) => {
                    println!("File changed, reprocessing...");
                    match self.fix_single_file(input_path, output_path, options, format) {
                        Ok(outcome) => {
                            println!("Processed: {} control(s) changed", outcome.change_log.len())
                        }
                        Err(e) => eprintln!("Processing failed: {}", e),
                    }
                }
                Err(e) => {
                    eprintln!("Watch error: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_check_command(&self, matches: &clap::ArgMatches) -> Result<()> {
        let input_path = matches.get_one::<String>("input").unwrap();

        let text = fs::read_to_string(input_path).map_err(|_| Error::FileNotFound {
            path: input_path.to_string(),
        })?;

        let document: serde_yaml::Value = serde_yaml::from_str(&text)?;
        if document.is_null() {
            return Err(Error::EmptyDocument);
        }

        let controls = count_controls(&document);
        println!("{}: OK, {} control(s)", input_path, controls);
        Ok(())
    }

    fn handle_sample_command(&self, matches: &clap::ArgMatches) -> Result<()> {
        if matches.get_flag("cards") {
            print!("{}", SAMPLE_CARDS_DOCUMENT);
        } else {
            print!("{}", SAMPLE_DOCUMENT);
        }
        Ok(())
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

/// Count control nodes in a parsed document.
fn count_controls(node: &serde_yaml::Value) -> usize {
    match node {
        serde_yaml::Value::Sequence(items) => items.iter().map(count_controls).sum(),
        serde_yaml::Value::Mapping(mapping) => mapping
            .iter()
            .map(|(_, value)| {
                let own = usize::from(
                    value
                        .as_mapping()
                        .map_or(false, |m| m.contains_key("Control")),
                );
                own + count_controls(value)
            })
            .sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sample_documents_parse_and_process() {
        for sample in [SAMPLE_DOCUMENT, SAMPLE_CARDS_DOCUMENT] {
            let outcome = process_document(sample, &Options::default()).unwrap();
            assert!(!outcome.change_log.is_empty());
        }
    }

    #[test]
    fn sample_document_renames_match_conventions() {
        let outcome = process_document(SAMPLE_DOCUMENT, &Options::default()).unwrap();
        assert_eq!(outcome.name_table.get("Form1"), Some("frmMain"));
        assert_eq!(outcome.name_table.get("Name_DataCard1"), Some("crdName"));
        assert_eq!(outcome.name_table.get("DataCardKey1"), Some("lblNameKey"));
        assert_eq!(outcome.name_table.get("DataCardValue1"), Some("txtName"));

        // The card's Update formula now points at the renamed input
        assert!(outcome.yaml.contains("Update: =txtName.Value"));
    }

    #[test]
    fn count_controls_finds_nested_controls() {
        let document: serde_yaml::Value = serde_yaml::from_str(SAMPLE_DOCUMENT).unwrap();
        assert_eq!(count_controls(&document), 4);
    }

    #[test]
    fn config_file_merges_beneath_flags() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("ctlfix.toml");
        fs::write(
            &config_path,
            "display_mode = true\ndata_source_name = \"HR_Records\"\n",
        )
        .unwrap();

        let mut cli = Cli::new();
        cli.load_config_file(config_path.to_str().unwrap()).unwrap();

        let command = cli.build_cli();
        let matches = command
            .try_get_matches_from(["ctlfix", "fix", "input.yaml"])
            .unwrap();
        let (_, sub_matches) = matches.subcommand().unwrap();
        let options = cli.build_options(sub_matches);

        assert!(options.display_mode);
        assert_eq!(options.data_source_name, "HR_Records");
        // Untouched fields keep their defaults
        assert!(!options.card_enhancement);
        assert!(options.reference_update);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("ctlfix.json");
        fs::write(&config_path, r#"{"data_source_name": "HR_Records"}"#).unwrap();

        let mut cli = Cli::new();
        cli.load_config_file(config_path.to_str().unwrap()).unwrap();

        let command = cli.build_cli();
        let matches = command
            .try_get_matches_from([
                "ctlfix",
                "fix",
                "input.yaml",
                "--fix-data-source",
                "--data-source",
                "Payroll",
                "--no-reference-update",
            ])
            .unwrap();
        let (_, sub_matches) = matches.subcommand().unwrap();
        let options = cli.build_options(sub_matches);

        assert!(options.data_source_fix);
        assert_eq!(options.data_source_name, "Payroll");
        assert!(!options.reference_update);
    }

    #[test]
    fn unknown_config_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("ctlfix.ini");
        fs::write(&config_path, "display_mode = true\n").unwrap();

        let mut cli = Cli::new();
        let err = cli
            .load_config_file(config_path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn fix_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let input_path = dir.path().join("app.yaml");
        let output_path = dir.path().join("app.fixed.yaml");
        fs::write(&input_path, SAMPLE_DOCUMENT).unwrap();

        let cli = Cli::new();
        let outcome = cli
            .fix_single_file(
                input_path.to_str().unwrap(),
                Some(&output_path.to_str().unwrap().to_string()),
                &Options::default(),
                &OutputFormat::Yaml,
            )
            .unwrap();

        assert_eq!(outcome.change_log.len(), 4);
        let written = fs::read_to_string(&output_path).unwrap();
        assert!(written.contains("frmMain:"));
    }

    #[test]
    fn json_format_contains_change_log() {
        let dir = TempDir::new().unwrap();
        let input_path = dir.path().join("app.yaml");
        let output_path = dir.path().join("app.json");
        fs::write(&input_path, SAMPLE_DOCUMENT).unwrap();

        let cli = Cli::new();
        cli.fix_single_file(
            input_path.to_str().unwrap(),
            Some(&output_path.to_str().unwrap().to_string()),
            &Options::default(),
            &OutputFormat::Json,
        )
        .unwrap();

        let written = fs::read_to_string(&output_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert!(parsed["changeLog"].is_array());
        assert_eq!(parsed["changeLog"][0]["original"], "Form1");
    }

    #[test]
    fn missing_input_is_a_file_not_found() {
        let cli = Cli::new();
        let err = cli
            .fix_single_file(
                "does-not-exist.yaml",
                None,
                &Options::default(),
                &OutputFormat::Yaml,
            )
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
