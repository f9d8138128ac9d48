use std::sync::Arc;

use gonogo_core::document::{Document, ExtractionResult, FailureReason, SourceStage};
use gonogo_core::extraction::ExtractionPipeline;
use gonogo_extraction::{HybridExtractionPipeline, MAX_OUTPUT_CHARS};
use gonogo_tests::{OcrScript, StubOcr, StubRenderer, StubTextLayer, TextLayerScript};

fn pipeline(
    text_layer: &Arc<StubTextLayer>,
    renderer: &Arc<StubRenderer>,
    ocr: &Arc<StubOcr>,
) -> HybridExtractionPipeline {
    HybridExtractionPipeline::with_stages(text_layer.clone(), renderer.clone(), ocr.clone())
}

fn pdf(id: &str) -> Document {
    Document::pdf(id, b"%PDF-1.4 fixture bytes".to_vec())
}

// ---------------------------------------------------------------------------
// Stage selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scanned_document_falls_through_to_ocr() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("Invoice No. 4471");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("scan.pdf"))
        .await;

    assert_eq!(result, ExtractionResult::text("Invoice No. 4471", SourceStage::Ocr));
    assert_eq!(renderer.calls(), 1);
    assert_eq!(ocr.acquired(), 1);
    assert_eq!(ocr.released(), 1);
}

#[tokio::test]
async fn rich_text_layer_skips_render_and_ocr() {
    let contract = "Clause ".repeat(285);
    let contract = contract.trim().to_string();
    assert!(contract.chars().count() > 1900 && contract.chars().count() < MAX_OUTPUT_CHARS);

    let text_layer = StubTextLayer::text(contract.clone());
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("should not be used");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("contract.pdf"))
        .await;

    assert_eq!(result, ExtractionResult::text(contract, SourceStage::TextLayer));
    assert_eq!(renderer.calls(), 0);
    assert_eq!(ocr.acquired(), 0);
}

#[tokio::test]
async fn exactly_threshold_chars_is_not_usable() {
    let text_layer = StubTextLayer::text("a".repeat(100));
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("from ocr");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("short.pdf"))
        .await;

    assert_eq!(result.stage(), Some(SourceStage::Ocr));
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn one_char_over_threshold_is_usable() {
    let text_layer = StubTextLayer::text("a".repeat(101));
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("from ocr");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("edge.pdf"))
        .await;

    assert_eq!(result.stage(), Some(SourceStage::TextLayer));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn whitespace_padding_does_not_count_toward_threshold() {
    let padded = format!("{}{}{}", " ".repeat(200), "x".repeat(50), "\n".repeat(200));
    let text_layer = StubTextLayer::text(padded);
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("from ocr");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("padded.pdf"))
        .await;

    assert_eq!(result.stage(), Some(SourceStage::Ocr));
}

#[tokio::test]
async fn undecodable_text_layer_falls_through_to_ocr() {
    let text_layer = StubTextLayer::new(TextLayerScript::Undecodable);
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("recovered");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("broken.pdf"))
        .await;

    assert_eq!(result, ExtractionResult::text("recovered", SourceStage::Ocr));
}

#[tokio::test]
async fn renderer_receives_the_document_bytes() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("ok");
    let doc = pdf("scan.pdf");

    pipeline(&text_layer, &renderer, &ocr).extract(&doc).await;

    let seen = renderer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], doc.view());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_failure_never_reaches_ocr() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::failing("pdftoppm exited with status 1");
    let ocr = StubOcr::text("unused");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("scan.pdf"))
        .await;

    assert_eq!(
        result,
        ExtractionResult::failure(FailureReason::Render {
            detail: "pdftoppm exited with status 1".into()
        })
    );
    assert_eq!(ocr.acquired(), 0);
    assert!(result.display_text().starts_with("ERROR_render"));
}

#[tokio::test]
async fn unavailable_ocr_engine_is_an_ocr_failure() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::new(OcrScript::Unavailable);

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("scan.pdf"))
        .await;

    assert!(matches!(
        result.failure_reason(),
        Some(FailureReason::Ocr { .. })
    ));
    assert_eq!(ocr.released(), 0);
}

#[tokio::test]
async fn recognition_error_still_releases_worker() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::new(OcrScript::Crash);

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("scan.pdf"))
        .await;

    assert!(matches!(
        result.failure_reason(),
        Some(FailureReason::Ocr { .. })
    ));
    assert_eq!(ocr.acquired(), 1);
    assert_eq!(ocr.released(), 1);
}

#[tokio::test]
async fn blank_ocr_output_is_labeled_empty() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("  \n\t ");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("blank.pdf"))
        .await;

    assert_eq!(result, ExtractionResult::failure(FailureReason::OcrEmpty));
    assert_eq!(result.display_text(), "ERROR_ocr_empty");
    assert_eq!(ocr.released(), 1);
}

#[tokio::test]
async fn unexpected_fault_is_labeled_with_document_id() {
    let text_layer = StubTextLayer::new(TextLayerScript::Fault);
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("unused");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("doc-77"))
        .await;

    assert_eq!(
        result,
        ExtractionResult::failure(FailureReason::Exception {
            document_id: "doc-77".into()
        })
    );
    assert_eq!(result.display_text(), "ERROR_doc-77");
    assert_eq!(renderer.calls(), 0);
}

// ---------------------------------------------------------------------------
// Output shaping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_layer_output_is_capped() {
    let text_layer = StubTextLayer::text("t".repeat(12_000));
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("unused");

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("long.pdf"))
        .await;

    assert_eq!(result.display_text().chars().count(), MAX_OUTPUT_CHARS);
    assert_eq!(result.stage(), Some(SourceStage::TextLayer));
}

#[tokio::test]
async fn ocr_output_is_capped_on_char_boundaries() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("é".repeat(6000));

    let result = pipeline(&text_layer, &renderer, &ocr)
        .extract(&pdf("scan.pdf"))
        .await;

    let text = result.display_text();
    assert_eq!(text.chars().count(), MAX_OUTPUT_CHARS);
    assert!(text.chars().all(|c| c == 'é'));
}

#[tokio::test]
async fn extraction_is_repeatable() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("Invoice No. 4471");
    let pipeline = pipeline(&text_layer, &renderer, &ocr);
    let doc = pdf("scan.pdf");

    let first = pipeline.extract(&doc).await;
    let second = pipeline.extract(&doc).await;

    assert_eq!(first, second);
    assert_eq!(ocr.acquired(), 2);
    assert_eq!(ocr.released(), 2);
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_extracts_every_document() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("page text");
    let pipeline = pipeline(&text_layer, &renderer, &ocr);

    let docs: Vec<Document> = (0..5).map(|i| pdf(&format!("doc-{i}"))).collect();
    let results = pipeline.extract_batch(&docs).await;

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.stage() == Some(SourceStage::Ocr)));
    assert_eq!(ocr.acquired(), 5);
    assert_eq!(ocr.released(), 5);
}

#[tokio::test]
async fn batch_results_follow_input_order() {
    let text_layer = StubTextLayer::new(TextLayerScript::Fault);
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("unused");
    let pipeline = pipeline(&text_layer, &renderer, &ocr);

    let docs = vec![pdf("a.pdf"), pdf("b.pdf")];
    let results = pipeline.extract_batch(&docs).await;

    assert_eq!(results[0].display_text(), "ERROR_a.pdf");
    assert_eq!(results[1].display_text(), "ERROR_b.pdf");
}

#[tokio::test]
async fn empty_batch_yields_no_results() {
    let text_layer = StubTextLayer::text("");
    let renderer = StubRenderer::ok();
    let ocr = StubOcr::text("unused");

    let results = pipeline(&text_layer, &renderer, &ocr).extract_batch(&[]).await;
    assert!(results.is_empty());
}
