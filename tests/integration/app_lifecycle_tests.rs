/*!
 * Tests of the application controller working on files
 */

use yaptwai::app_config::Config;
use yaptwai::app_controller::Controller;
use yaptwai::providers::mock::MockProvider;
use crate::common;

fn spanish_config() -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "es".to_string();
    config
}

/// Test that a run writes `<stem>.<target>.pdf` with translated text
#[tokio::test]
async fn test_controller_run_withValidPdf_shouldWriteTranslatedFile() {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(temp_dir.path(), "letter.pdf", &common::pdf_with_pages(&["Hello"])).unwrap();
    let output_dir = temp_dir.path().join("out");
    let controller = Controller::with_service(
        spanish_config(),
        common::mock_service(MockProvider::dictionary([("Hello", "Hola")]), 0),
    );

    let written = controller.run(input, output_dir.clone(), false).await.unwrap();

    let expected = output_dir.join("letter.es.pdf");
    assert_eq!(written, Some(expected.clone()));
    let bytes = std::fs::read(&expected).unwrap();
    assert_eq!(common::block_texts(&bytes, 1), vec!["Hola"]);
    assert!(!output_dir.join("letter.es.issues.log").exists());
}

/// Test that an existing output is kept unless overwriting is forced
#[tokio::test]
async fn test_controller_run_withExistingOutput_shouldSkipWithoutForce() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(temp_dir.path(), "doc.pdf", &common::pdf_with_pages(&["Hello"])).unwrap();
    let provider = MockProvider::working();
    let controller = Controller::with_service(spanish_config(), common::mock_service(provider.clone(), 0));
    let out = temp_dir.path().to_path_buf();

    assert!(controller.run(input.clone(), out.clone(), false).await.unwrap().is_some());
    assert!(controller.run(input.clone(), out.clone(), false).await.unwrap().is_none());
    assert_eq!(provider.request_count(), 1);

    assert!(controller.run(input, out, true).await.unwrap().is_some());
}

/// Test that a bad page range leaves no output behind
#[tokio::test]
async fn test_controller_run_withInvalidRange_shouldWriteNothing() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(temp_dir.path(), "doc.pdf", &common::pdf_with_pages(&["A", "B"])).unwrap();
    let mut config = spanish_config();
    config.pdf.start_page = Some(2);
    config.pdf.end_page = Some(5);
    let controller = Controller::with_service(config, common::mock_service(MockProvider::working(), 0));

    let result = controller.run(input, temp_dir.path().to_path_buf(), false).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("doc.es.pdf").exists());
}

/// Test that the deadline aborts a slow run without writing
#[tokio::test]
async fn test_controller_run_withElapsedDeadline_shouldFailWithoutOutput() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(temp_dir.path(), "slow.pdf", &common::pdf_with_pages(&["Hello"])).unwrap();
    let mut config = spanish_config();
    config.pdf.run_timeout_secs = Some(1);
    let controller = Controller::with_service(config, common::mock_service(MockProvider::slow(5_000), 0));

    let result = controller.run(input, temp_dir.path().to_path_buf(), false).await;

    let error = result.unwrap_err();
    assert!(format!("{:#}", error).contains("aborted after 1 seconds"));
    assert!(!temp_dir.path().join("slow.es.pdf").exists());
}

/// Test that failed blocks are written to an issues log next to the output
#[tokio::test]
async fn test_controller_run_withFailingProvider_shouldWriteIssuesLog() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(temp_dir.path(), "doc.pdf", &common::pdf_with_pages(&["Hello"])).unwrap();
    let controller = Controller::with_service(spanish_config(), common::mock_service(MockProvider::failing(), 0));

    let written = controller.run(input, temp_dir.path().to_path_buf(), false).await.unwrap();

    assert!(written.is_some());
    let log = std::fs::read_to_string(temp_dir.path().join("doc.es.issues.log")).unwrap();
    assert!(log.contains("page 1 block 0"));
}

/// Test that non-PDF input is rejected
#[tokio::test]
async fn test_controller_run_withTextFile_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(temp_dir.path(), "notes.txt", b"plain text").unwrap();
    let controller = Controller::with_service(spanish_config(), common::mock_service(MockProvider::working(), 0));

    assert!(controller.run(input, temp_dir.path().to_path_buf(), false).await.is_err());
}

/// Test that inspect lists blocks and writes an outlined copy
#[test]
fn test_controller_inspect_withOutline_shouldWriteCopy() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::write_test_file(
        temp_dir.path(),
        "doc.pdf",
        &common::pdf_with_pages(&["First page", "", "Third page"]),
    )
    .unwrap();
    let outline = temp_dir.path().join("outlined.pdf");
    let controller = Controller::with_config(Config::default()).unwrap();

    let report = controller.inspect(&input, Some(&outline)).unwrap();

    assert_eq!(report.page_count, 3);
    assert_eq!(report.block_count(), 2);
    assert!(report.pages[1].blocks.is_empty());
    assert_eq!(report.pages[2].blocks[0].text, "Third page");
    assert!(outline.exists());
    assert_eq!(common::page_count(&std::fs::read(&outline).unwrap()), 3);
}

/// Test that bytes in memory translate without touching the file system
#[test]
fn test_controller_translate_bytes_withDictionaryProvider_shouldReturnPdf() {
    let controller = Controller::with_config(spanish_config()).unwrap();
    let pdf = common::pdf_with_pages(&["Hello"]);

    let output = tokio_test::block_on(async {
        controller
            .translate_bytes(&pdf, common::mock_service(MockProvider::dictionary([("Hello", "Hola")]), 0))
            .await
    })
    .unwrap();

    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Hola"]);
    assert!(output.report.is_clean());
}
