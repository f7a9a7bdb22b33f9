//! Layout integration tests driven by synthetic pages.
//!
//! No pdfium needed: pages are built from text runs and operators directly
//! and fed through `convert_pages`.

use futures::StreamExt;
use pdf_layout_md::{
    convert_pages, convert_stream_with_registry, ColorSpace, ConversionConfig,
    ConversionProgressCallback, ImageHandle, ImageOutput, ImageRegistry, Matrix, Operator,
    PageContent, PageSeparator, Pdf2MdError, RawImage, SharedRegistry, SourceError, TextRun,
};
use std::sync::{Arc, Mutex};

const W: f32 = 612.0;
const H: f32 = 792.0;

fn page(n: usize) -> PageContent {
    PageContent::new(n, W, H)
}

fn run(text: &str, x: f32, y: f32, size: f32, width: f32) -> TextRun {
    TextRun::at(text, x, y, size).with_width(width)
}

fn gray(w: u32, h: u32) -> ImageHandle {
    ImageHandle::Raw(RawImage {
        width: w,
        height: h,
        samples: vec![200; (w * h) as usize],
        color_space: ColorSpace::Gray,
    })
}

async fn markdown(pages: Vec<PageContent>, config: &ConversionConfig) -> String {
    convert_pages(pages.into_iter().map(Ok), config)
        .await
        .expect("conversion succeeds")
        .markdown
}

#[tokio::test]
async fn single_run_round_trip() {
    let p = page(1).with_runs([run("A single paragraph.", 72.0, 400.0, 12.0, 100.0)]);
    let result = convert_pages([Ok(p)], &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(result.markdown, "A single paragraph.\n\n");
    assert!(result.images.is_empty());
    assert_eq!(result.stats.processed_pages, 1);
    assert_eq!(result.stats.empty_pages, 0);
}

#[tokio::test]
async fn heading_then_paragraphs() {
    let p = page(1).with_runs([
        run("Introduction", 72.0, 700.0, 24.0, 150.0),
        run("This is the first line of the body", 72.0, 650.0, 12.0, 400.0),
        run("and this continues it.", 72.0, 636.0, 12.0, 200.0),
        run("A new paragraph starts here after a short line.", 72.0, 600.0, 12.0, 390.0),
    ]);
    let md = markdown(vec![p], &ConversionConfig::default()).await;
    assert_eq!(
        md,
        "# Introduction\n\n\
         This is the first line of the body and this continues it.\n\n\
         A new paragraph starts here after a short line.\n\n"
    );
}

#[tokio::test]
async fn scrambled_run_order_gives_same_output() {
    let runs = vec![
        run("Title", 72.0, 700.0, 18.0, 60.0),
        run("world", 110.0, 500.0, 12.0, 30.0),
        run("hello", 72.0, 500.0, 12.0, 30.0),
        run("second line here", 72.0, 480.0, 12.0, 100.0),
    ];
    let mut reversed = runs.clone();
    reversed.reverse();

    let config = ConversionConfig::default();
    let a = markdown(vec![page(1).with_runs(runs)], &config).await;
    let b = markdown(vec![page(1).with_runs(reversed)], &config).await;
    assert_eq!(a, b);
    assert!(a.starts_with("## Title\n\nhello world"), "{a:?}");
}

#[tokio::test]
async fn cjk_lines_merge_without_space() {
    let p = page(1).with_runs([
        run("你好", 72.0, 500.0, 12.0, 400.0),
        run("世界", 72.0, 485.0, 12.0, 400.0),
    ]);
    let md = markdown(vec![p], &ConversionConfig::default()).await;
    assert_eq!(md, "你好世界\n\n");
}

#[tokio::test]
async fn page_furniture_is_dropped() {
    let p = page(1).with_runs([
        run("Journal of Examples, Vol. 3", 72.0, 765.0, 8.0, 150.0),
        run("Body text stays.", 72.0, 400.0, 12.0, 100.0),
        run("Page 3", 290.0, 30.0, 9.0, 30.0),
        run("https://example.org", 400.0, 30.0, 12.0, 100.0),
    ]);
    let md = markdown(vec![p], &ConversionConfig::default()).await;
    assert_eq!(md, "Body text stays.\n\n");
}

#[tokio::test]
async fn image_written_to_directory_between_text() {
    let dir = tempfile::tempdir().unwrap();
    let p = page(1)
        .with_runs([
            run("Above", 72.0, 600.0, 12.0, 40.0),
            run("Below", 72.0, 200.0, 12.0, 40.0),
        ])
        .with_operators([
            Operator::Transform(Matrix::new(100.0, 0.0, 0.0, 80.0, 72.0, 400.0)),
            Operator::PaintImage("Im0".into()),
        ])
        .with_image("Im0", gray(4, 4));

    let config = ConversionConfig::builder()
        .images_dir(dir.path().join("img"), "img")
        .build()
        .unwrap();
    let result = convert_pages([Ok(p)], &config).await.unwrap();

    assert_eq!(
        result.markdown,
        "Above\n\n![Image](img/img_p1_1.png)\n\nBelow\n\n"
    );
    assert_eq!(result.image_url("img_p1_1"), Some("img/img_p1_1.png"));
    assert!(dir.path().join("img/img_p1_1.png").exists());
    assert_eq!(result.stats.total_images, 1);
}

fn page_with_image(number: usize, caption: &str) -> PageContent {
    PageContent::new(number, W, H)
        .with_runs([run(caption, 72.0, 300.0, 12.0, 80.0)])
        .with_operators([
            Operator::Transform(Matrix::new(100.0, 0.0, 0.0, 80.0, 72.0, 400.0)),
            Operator::PaintImage("Im0".into()),
        ])
        .with_image("Im0", gray(4, 4))
}

#[tokio::test]
async fn image_ids_follow_document_position() {
    // Both pages claim to be page 7; ids come from where they sit in the input.
    let a = page_with_image(7, "first");
    let b = page_with_image(7, "second");
    let result = convert_pages([Ok(a), Ok(b)], &ConversionConfig::default())
        .await
        .unwrap();

    let ids: Vec<&str> = result.images.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["img_p1_1", "img_p2_1"]);
    let nums: Vec<usize> = result.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(nums, vec![1, 2]);
    assert_eq!(result.stats.skipped_images, 0);
    assert!(result.pages[1].markdown.starts_with("![Image](data:image/png;base64,"));
}

#[tokio::test]
async fn unnumbered_pages_keep_every_image() {
    let a = page_with_image(0, "left");
    let result = convert_pages([Ok(a.clone()), Ok(a)], &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(result.images.len(), 2);
    assert_eq!(result.stats.total_images, 2);
}

#[tokio::test]
async fn streamed_images_land_in_shared_registry() {
    let registry: SharedRegistry = Arc::new(tokio::sync::Mutex::new(ImageRegistry::new()));
    let pages: Vec<(usize, Result<PageContent, SourceError>)> = vec![
        (1, Ok(page_with_image(0, "one"))),
        (2, Ok(page(0).with_runs([run("text only", 72.0, 400.0, 12.0, 60.0)]))),
        (3, Ok(page_with_image(0, "three"))),
    ];
    let results: Vec<_> = convert_stream_with_registry(
        pages.into_iter(),
        &ConversionConfig::default(),
        Arc::clone(&registry),
    )
    .collect()
    .await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|p| p.skipped_images == 0)));

    let registry = registry.lock().await;
    let ids: Vec<&str> = registry.resources().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["img_p1_1", "img_p3_1"]);
}

#[tokio::test]
async fn embedded_images_use_data_uris() {
    let p = page(1)
        .with_operators([
            Operator::Save,
            Operator::Transform(Matrix::new(50.0, 0.0, 0.0, 50.0, 100.0, 300.0)),
            Operator::PaintInlineImage(gray(2, 2)),
            Operator::Restore,
        ]);
    let result = convert_pages([Ok(p)], &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(result.images.len(), 1);
    assert!(result.images[0].url.starts_with("data:image/png;base64,"));
    assert_eq!(
        result.markdown,
        format!("![Image]({})\n\n", result.images[0].url)
    );
}

#[tokio::test]
async fn omitted_images_leave_text_only() {
    let p = page(1)
        .with_runs([run("Caption text", 72.0, 300.0, 12.0, 80.0)])
        .with_operators([
            Operator::Transform(Matrix::new(100.0, 0.0, 0.0, 100.0, 72.0, 400.0)),
            Operator::PaintImage("Im0".into()),
        ])
        .with_image("Im0", gray(3, 3));
    let config = ConversionConfig::builder()
        .image_output(ImageOutput::Omit)
        .build()
        .unwrap();
    let result = convert_pages([Ok(p)], &config).await.unwrap();
    assert_eq!(result.markdown, "Caption text\n\n");
    assert!(result.images.is_empty());
}

#[tokio::test]
async fn pages_concatenate_with_separator() {
    let pages = vec![
        page(1).with_runs([run("Alpha", 72.0, 400.0, 12.0, 40.0)]),
        page(2),
        page(3).with_runs([run("Gamma", 72.0, 400.0, 12.0, 40.0)]),
    ];

    let plain = convert_pages(pages.clone().into_iter().map(Ok), &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(plain.markdown, "Alpha\n\nGamma\n\n");
    assert_eq!(plain.stats.empty_pages, 1);
    assert!(plain.pages[1].is_empty());

    let config = ConversionConfig::builder()
        .page_separator(PageSeparator::HorizontalRule)
        .build()
        .unwrap();
    let ruled = convert_pages(pages.into_iter().map(Ok), &config).await.unwrap();
    assert_eq!(ruled.markdown, "Alpha\n\n---\n\nGamma\n\n");
}

#[tokio::test]
async fn page_source_error_fails_whole_document() {
    let pages = vec![
        Ok(page(1).with_runs([run("fine", 72.0, 400.0, 12.0, 40.0)])),
        Ok(page(2).with_runs([run("fine", 72.0, 400.0, 12.0, 40.0)])),
        Err(SourceError::new("content stream truncated")),
    ];
    let err = convert_pages(pages, &ConversionConfig::default())
        .await
        .unwrap_err();
    match err {
        Pdf2MdError::PageSource { page, detail } => {
            assert_eq!(page, 3);
            assert!(detail.contains("truncated"));
        }
        other => panic!("expected PageSource, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_document_is_empty_markdown() {
    let result = convert_pages(Vec::new(), &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(result.markdown, "");
    assert_eq!(result.stats.total_pages, 0);
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, total_pages: usize) {
        self.0.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.0.lock().unwrap().push(format!("page {page_num}"));
    }
    fn on_image_skipped(&self, page_num: usize, image: &str, _reason: &str) {
        self.0.lock().unwrap().push(format!("skip {page_num} {image}"));
    }
    fn on_conversion_complete(&self, total_pages: usize, content_pages: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("done {total_pages} {content_pages}"));
    }
}

#[tokio::test]
async fn progress_events_in_order() {
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let pages = vec![
        page(1).with_runs([run("one", 72.0, 400.0, 12.0, 40.0)]),
        page(2).with_operators([Operator::PaintImage("Gone".into())]),
    ];
    convert_pages(pages.into_iter().map(Ok), &config).await.unwrap();

    let events = recorder.0.lock().unwrap().clone();
    assert_eq!(
        events,
        vec!["start 2", "page 1", "page 2", "skip 2 Gone", "done 2 1"]
    );
}
