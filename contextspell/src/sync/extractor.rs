//! Wiki markup to plain text, through an external extractor program.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use quick_xml::escape::escape;

use super::source::{Revision, TextExtractor};
use super::SyncError;

/// A dump-like XML document holding one revision per page, the input format
/// of wiki text extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupDocument {
    base: String,
    pages: Vec<Revision>,
}

impl MarkupDocument {
    /// `site` is the wiki root, e.g. `https://it.wikipedia.org/`.
    pub fn new(site: &str) -> MarkupDocument {
        MarkupDocument {
            base: format!("{}wiki", site),
            pages: Vec::new(),
        }
    }

    pub fn push(&mut self, revision: Revision) {
        self.pages.push(revision);
    }

    pub fn pages(&self) -> &[Revision] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(
            64 + self.pages.iter().map(|p| p.content.len() + 128).sum::<usize>(),
        );
        xml.push_str("<mediawiki><base>");
        xml.push_str(&escape(self.base.as_str()));
        xml.push_str("</base>");
        for page in &self.pages {
            xml.push_str("<page><title>");
            xml.push_str(&escape(page.title.as_str()));
            xml.push_str("</title><id>");
            xml.push_str(&page.page_id.to_string());
            xml.push_str("</id><revision><id>");
            xml.push_str(&page.revid.to_string());
            xml.push_str("</id><text>");
            xml.push_str(&escape(page.content.as_str()));
            xml.push_str("</text></revision></page>");
        }
        xml.push_str("</mediawiki>");
        xml
    }
}

/// Runs an extractor program on a temporary copy of the document.
///
/// Arguments may contain `{input}` and `{output}`, replaced with the paths of
/// the XML file and of the plain text the program must produce. The output
/// may be a file or a directory of files, read in name order.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>) -> CommandExtractor {
        CommandExtractor::with_args(
            program,
            vec!["-fplain".into(), "-o{output}".into(), "{input}".into()],
        )
    }

    pub fn with_args(program: impl Into<PathBuf>, args: Vec<String>) -> CommandExtractor {
        CommandExtractor {
            program: program.into(),
            args,
        }
    }
}

impl TextExtractor for CommandExtractor {
    fn extract(&self, document: &MarkupDocument) -> Result<String, SyncError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.xml");
        let output = dir.path().join("output.raw");
        fs::write(&input, document.to_xml())?;

        let input_arg = input.to_string_lossy();
        let output_arg = output.to_string_lossy();
        let args = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input_arg)
                    .replace("{output}", &output_arg)
            })
            .collect::<Vec<_>>();

        log::debug!("Running {} {:?}", self.program.display(), args);
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| {
                SyncError::Extract(format!("cannot run {}: {}", self.program.display(), e))
            })?;

        if !status.success() {
            return Err(SyncError::Extract(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }

        read_output(&output)
    }
}

fn read_output(path: &Path) -> Result<String, SyncError> {
    if !path.exists() {
        return Err(SyncError::Extract(format!(
            "no output at {}",
            path.display()
        )));
    }

    let mut files = Vec::new();
    collect_files(path, &mut files)?;
    files.sort();

    let mut text = String::new();
    for file in files {
        let bytes = fs::read(&file)?;
        text.push_str(&String::from_utf8_lossy(&bytes));
        if !text.ends_with('\n') {
            text.push('\n');
        }
    }
    Ok(text)
}

fn collect_files(path: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            collect_files(&entry?.path(), out)?;
        }
    } else {
        out.push(path.to_path_buf());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision(revid: u64, title: &str, content: &str) -> Revision {
        Revision {
            revid,
            page_id: 7,
            title: title.into(),
            content: content.into(),
        }
    }

    #[test]
    fn builds_escaped_document() {
        let mut document = MarkupDocument::new("https://it.wikipedia.org/");
        assert!(document.is_empty());
        document.push(revision(12, "Tom & Jerry", "a <b>bold</b> move"));

        assert_eq!(
            document.to_xml(),
            "<mediawiki><base>https://it.wikipedia.org/wiki</base>\
             <page><title>Tom &amp; Jerry</title><id>7</id>\
             <revision><id>12</id><text>a &lt;b&gt;bold&lt;/b&gt; move</text></revision>\
             </page></mediawiki>"
        );
    }

    #[cfg(unix)]
    #[test]
    fn runs_the_program() {
        let mut document = MarkupDocument::new("http://localhost/");
        document.push(revision(1, "Page", "text"));

        let extractor = CommandExtractor::with_args("cp", vec!["{input}".into(), "{output}".into()]);
        let text = extractor.extract(&document).unwrap();
        assert_eq!(text, format!("{}\n", document.to_xml()));
    }

    #[cfg(unix)]
    #[test]
    fn reads_output_directories() {
        let document = MarkupDocument::new("http://localhost/");
        let extractor = CommandExtractor::with_args(
            "sh",
            vec![
                "-c".into(),
                "mkdir -p {output}/AA && printf 'two\\n' > {output}/AA/wiki_01 && printf 'one\\n' > {output}/AA/wiki_00".into(),
            ],
        );
        assert_eq!(extractor.extract(&document).unwrap(), "one\ntwo\n");
    }

    #[cfg(unix)]
    #[test]
    fn failures_are_extract_errors() {
        let document = MarkupDocument::new("http://localhost/");
        let failing = CommandExtractor::with_args("false", vec![]);
        assert!(matches!(failing.extract(&document), Err(SyncError::Extract(_))));

        let missing = CommandExtractor::new("/definitely/not/an/extractor");
        assert!(matches!(missing.extract(&document), Err(SyncError::Extract(_))));

        let silent = CommandExtractor::with_args("true", vec![]);
        assert!(matches!(silent.extract(&document), Err(SyncError::Extract(_))));
    }
}
