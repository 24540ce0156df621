use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::io::Read;
use std::path::Path;
use tgstat_core::domain::PageSnapshot;
use tgstat_core::ports::{PageSource, Result};
use tgstat_core::utils::clean_text;
use tgstat_core::CoreError;

const TITLE_SELECTOR: &str = "h1";
const SUBSCRIBERS_SELECTOR: &str = ".sticky-right-column h2";
const POSTS_LIST_SELECTOR: &str = "#posts-lists-container .posts-list";
const POST_HEADER_SELECTOR: &str = ".post-header";
const POST_DATE_SELECTOR: &str = "p small";
const CANONICAL_SELECTOR: &str = r#"link[rel="canonical"]"#;
const OG_URL_SELECTOR: &str = r#"meta[property="og:url"]"#;

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CoreError::Page(format!("invalid selector {:?}: {}", css, e)))
}

/// Trimmed text content; an element without text reads as ""
fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Saved TGStat channel page, read with the page's CSS structure
pub struct HtmlPageSource {
    html: String,
    page_url: Option<String>,
}

impl HtmlPageSource {
    /// `page_url` is the address the page was loaded from; when `None` it is
    /// taken from the document's canonical link.
    pub fn new(html: String, page_url: Option<String>) -> Self {
        Self { html, page_url }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, page_url: Option<String>) -> Result<Self> {
        let html = fs::read_to_string(path)?;
        Ok(Self::new(html, page_url))
    }

    pub fn from_reader<R: Read>(mut reader: R, page_url: Option<String>) -> Result<Self> {
        let mut html = String::new();
        reader.read_to_string(&mut html)?;
        Ok(Self::new(html, page_url))
    }

    fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
        let sel = selector(css)?;
        let text = document.select(&sel).next().map(element_text);
        if text.is_none() {
            tracing::warn!(selector = css, "element not found on page");
        }
        Ok(text)
    }

    fn document_url(document: &Html) -> Result<Option<String>> {
        let canonical = selector(CANONICAL_SELECTOR)?;
        if let Some(href) = document
            .select(&canonical)
            .find_map(|el| el.value().attr("href"))
        {
            return Ok(clean_text(href));
        }

        let og_url = selector(OG_URL_SELECTOR)?;
        Ok(document
            .select(&og_url)
            .find_map(|el| el.value().attr("content"))
            .and_then(clean_text))
    }

    /// Date texts of the first posts list, or `None` if the page has none
    fn post_date_texts(document: &Html) -> Result<Option<Vec<String>>> {
        let list_sel = selector(POSTS_LIST_SELECTOR)?;
        let header_sel = selector(POST_HEADER_SELECTOR)?;
        let date_sel = selector(POST_DATE_SELECTOR)?;

        let list = match document.select(&list_sel).next() {
            Some(list) => list,
            None => {
                tracing::warn!(selector = POSTS_LIST_SELECTOR, "posts list not found");
                return Ok(None);
            }
        };

        let mut texts = Vec::new();
        for header in list.select(&header_sel) {
            match header.select(&date_sel).next() {
                Some(date) => texts.push(element_text(date)),
                None => tracing::debug!("post header without a date element"),
            }
        }
        Ok(Some(texts))
    }
}

impl PageSource for HtmlPageSource {
    fn snapshot(&self) -> Result<PageSnapshot> {
        let document = Html::parse_document(&self.html);

        let page_url = match &self.page_url {
            Some(url) => url.clone(),
            None => Self::document_url(&document)?.unwrap_or_else(|| {
                tracing::warn!("page address not given and not found in document");
                String::new()
            }),
        };

        Ok(PageSnapshot {
            title: Self::first_text(&document, TITLE_SELECTOR)?,
            page_url,
            subscribers: Self::first_text(&document, SUBSCRIBERS_SELECTOR)?,
            post_date_texts: Self::post_date_texts(&document)?,
        })
    }
}
