use anyhow::Result;
use datadroid::{
    CsvParser, DataError, DataParser, InputFormat, LineParser, ListBinder, ParseEngine, ParseTask,
    Record, RecordList, Source, SourceSpec, TaskStatus, TomlConfig, WorkerPool,
};
use httpmock::prelude::*;
use serde::Deserialize;
use std::io::Read;
use tempfile::TempDir;

#[derive(Debug, Deserialize, PartialEq)]
struct Appalto {
    importo: String,
    oggetto: String,
    aggiudicatario: String,
}

/// Custom parser: `key=value` pairs, one per line.
struct KeyValueParser;

impl DataParser for KeyValueParser {
    type Record = (String, String);

    fn parse(&self, input: &mut dyn Read) -> datadroid::Result<Vec<(String, String)>> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        text.lines()
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| {
                line.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| DataError::MalformedError {
                        line: i + 1,
                        message: format!("missing '=' in {:?}", line),
                    })
            })
            .collect()
    }
}

#[tokio::test]
async fn test_csv_over_http_end_to_end() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/appalti.csv");
        then.status(200)
            .header("Content-Type", "text/csv")
            .body("importo;oggetto;aggiudicatario\n1500;Road works;Acme\n300;Cleaning;Brillo\n");
    });

    let pool = WorkerPool::new(2)?;
    let source = Source::from_location(&server.url("/appalti.csv"))?;
    let mut task = ParseTask::new(CsvParser::<Appalto>::new().delimiter(b';'), source, &pool);

    let records = task.execute_and_retrieve().await?;

    api_mock.assert();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].aggiudicatario, "Acme");
    assert_eq!(records[1].oggetto, "Cleaning");
    assert_eq!(task.status(), TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_custom_parser_with_binder() -> Result<()> {
    let pool = WorkerPool::new(1)?;
    let mut task = ParseTask::new(KeyValueParser, "host=example\nport=8080\n", &pool);

    let pairs = task.execute_and_retrieve().await?;
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[1], ("port".to_string(), "8080".to_string()));

    let records = pairs
        .iter()
        .map(|(k, v)| Record::new().with_field("key", k.as_str()).with_field("value", v.as_str()))
        .collect::<Vec<_>>();
    let binder = ListBinder::new(RecordList::from(records), vec!["value".to_string()]);
    let values: Vec<String> = binder
        .rows()
        .map(|row| row.cells[0].text.clone())
        .collect();
    assert_eq!(values, vec!["example", "8080"]);
    Ok(())
}

#[tokio::test]
async fn test_custom_parser_error_propagates() -> Result<()> {
    let pool = WorkerPool::new(1)?;
    let mut task = ParseTask::new(KeyValueParser, "host=example\nbroken\n", &pool);

    let err = task.execute_and_retrieve().await.unwrap_err();
    match err {
        DataError::ExecutionError { parser, source } => {
            assert_eq!(parser, "KeyValueParser");
            assert!(matches!(
                source.as_ref(),
                DataError::MalformedError { line: 2, .. }
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(task.status(), TaskStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_http_failure_surfaces_as_error() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(503);
    });

    let pool = WorkerPool::new(1)?;
    let parser = LineParser::new(|line: &str| Ok(line.to_string()));
    let mut task = ParseTask::new(parser, Source::from_location(&server.url("/gone"))?, &pool);

    let result = task.execute_and_retrieve().await;

    api_mock.assert();
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_engine_from_toml_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data_path = temp_dir.path().join("appalti.json");
    tokio::fs::write(
        &data_path,
        r#"[{"importo": "10", "oggetto": "Paint"}, {"importo": "20", "oggetto": "Glass"}]"#,
    )
    .await?;

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/notes.txt");
        then.status(200).body("first\n\nsecond\nthird\n");
    });

    let normalized = data_path.to_str().unwrap().replace('\\', "/");
    let config_content = format!(
        r#"
[pool]
workers = 2

[binder]
labels = ["oggetto", "importo"]

[[sources]]
location = "{}"
format = "json"

[[sources]]
location = "{}"
format = "lines"
"#,
        normalized,
        server.url("/notes.txt")
    );
    let config_path = temp_dir.path().join("datadroid.toml");
    tokio::fs::write(&config_path, config_content).await?;

    let config = TomlConfig::from_file(&config_path)?;
    let labels = config.binder.labels.clone();
    let outcomes = ParseEngine::new(config).run().await?;

    api_mock.assert();
    assert_eq!(outcomes.len(), 2);

    let binder = outcomes[0].binder(&labels).unwrap();
    assert_eq!(binder.item_count(), 2);
    let row = binder.bind(1).unwrap();
    assert_eq!(row.text("oggetto"), Some("Glass"));
    assert_eq!(row.text("importo"), Some("20"));

    let notes = outcomes[1].binder(&[]).unwrap();
    assert_eq!(notes.item_count(), 3);
    assert_eq!(notes.bind(2).unwrap().text("line"), Some("third"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sources_share_one_pool() -> Result<()> {
    let server = MockServer::start();
    let mocks: Vec<_> = (0..5)
        .map(|i| {
            server.mock(|when, then| {
                when.method(GET).path(format!("/part-{}", i));
                then.status(200).body(
                    (0..=i)
                        .map(|n| format!("{}\n", n))
                        .collect::<String>(),
                );
            })
        })
        .collect();

    let pool = WorkerPool::new(2)?;
    let mut tasks = Vec::new();
    for i in 0..5 {
        let source = Source::from_location(&server.url(format!("/part-{}", i)))?;
        let mut task = ParseTask::new(
            LineParser::new(|line: &str| {
                line.parse::<u32>().map_err(|e| DataError::MalformedError {
                    line: 0,
                    message: e.to_string(),
                })
            }),
            source,
            &pool,
        );
        task.execute()?;
        tasks.push(task);
    }

    for (i, task) in tasks.iter_mut().enumerate() {
        let numbers = task.retrieve().await?;
        assert_eq!(&numbers[..], &(0..=i as u32).collect::<Vec<_>>()[..]);
    }
    for mock in mocks {
        mock.assert();
    }
    Ok(())
}

#[tokio::test]
async fn test_engine_with_format_spec_helpers() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("rows.tsv");
    tokio::fs::write(&path, "a\tb\n1\t2\n3\t4\n").await?;

    let mut spec = SourceSpec::new(path.to_str().unwrap(), InputFormat::Csv);
    spec.delimiter = "\\t".to_string();

    let config = TomlConfig {
        pool: Default::default(),
        binder: Default::default(),
        sources: vec![spec],
    };
    let outcomes = ParseEngine::new(config).run().await?;

    let records = outcomes[0].result.as_ref().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("a").and_then(|v| v.as_i64()), Some(3));
    Ok(())
}
