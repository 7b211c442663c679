//! Extraction of file blocks from oracle text.
//!
//! The expected format is a heading followed by one fenced block:
//!
//! ````text
//! ### FILE: src/index.ts
//! ```ts
//! export {};
//! ```
//! ````

use std::path::{Component, Path};

use forge_spec::GeneratedFile;
use tracing::warn;

const FILE_HEADING: &str = "### FILE:";

/// An open code fence: its marker character and length.
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    /// Parse a fence line, returning the fence and whether it carries an
    /// info string (```` ```ts ````).
    fn parse(line: &str) -> Option<(Fence, bool)> {
        let trimmed = line.trim();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        Some((Fence { marker, len }, !info.is_empty()))
    }

    fn matches(&self, other: &Fence) -> bool {
        self.marker == other.marker && other.len >= self.len
    }
}

/// Parse every `### FILE: <path>` block in `text`.
///
/// A block ends at a bare fence of the same marker at least as long as the
/// opening one. Fences with an info string inside the block open nested
/// examples and must be closed before the block can end.
///
/// A path appearing twice keeps its last content. Blocks with an absolute
/// path or a `..` component are dropped, as are blocks with no fenced body.
/// `./` components are stripped.
pub fn extract_file_blocks(text: &str) -> Vec<GeneratedFile> {
    let mut files: Vec<GeneratedFile> = Vec::new();
    let mut current: Option<String> = None;
    let mut content = String::new();
    let mut open: Option<Fence> = None;
    let mut nested = 0usize;
    let mut seen_block = false;

    let mut flush = |path: Option<String>, content: &str, seen_block: bool| {
        let Some(path) = path else { return };
        if !seen_block {
            return;
        }
        let Some(path) = normalize_path(&path) else {
            warn!("Ignoring file block with unsafe path: {}", path);
            return;
        };
        files.retain(|f| f.path != path);
        files.push(GeneratedFile::new(path, content));
    };

    for line in text.lines() {
        let Some(fence) = open else {
            if let Some(rest) = line.trim_start().strip_prefix(FILE_HEADING) {
                flush(current.take(), &content, seen_block);
                let path = rest.trim().trim_matches('`').trim();
                current = (!path.is_empty()).then(|| path.to_string());
                content.clear();
                seen_block = false;
                continue;
            }
            if let Some((fence, _)) = Fence::parse(line) {
                if current.is_some() && !seen_block {
                    open = Some(fence);
                    nested = 0;
                    seen_block = true;
                }
            }
            continue;
        };

        if let Some((inner, has_info)) = Fence::parse(line) {
            if fence.matches(&inner) {
                if has_info {
                    nested += 1;
                } else if nested == 0 {
                    open = None;
                    continue;
                } else {
                    nested -= 1;
                }
            }
        }
        content.push_str(line);
        content.push('\n');
    }
    flush(current.take(), &content, seen_block);

    files
}

/// Relative path with `.` components removed, or `None` if the path is
/// absolute, escapes upwards, or is empty.
fn normalize_path(path: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_multiple_files() {
        let text = "Here is the project.\n\n\
### FILE: package.json\n```json\n{\"name\": \"demo\"}\n```\n\n\
Some prose in between.\n\n\
### FILE: src/index.ts\n```typescript\nexport const x = 1;\nexport const y = 2;\n```\n";

        let files = extract_file_blocks(text);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "package.json");
        assert_eq!(files[0].content, "{\"name\": \"demo\"}\n");
        assert_eq!(files[1].path, "src/index.ts");
        assert_eq!(files[1].content, "export const x = 1;\nexport const y = 2;\n");
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        let text = "### FILE: /etc/passwd\n```\nroot\n```\n\
### FILE: ../outside.ts\n```\nx\n```\n\
### FILE: src/ok.ts\n```\nok\n```\n";

        let files = extract_file_blocks(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/ok.ts");
    }

    #[test]
    fn test_last_block_wins_and_backticks_trimmed() {
        let text = "### FILE: `src/a.ts`\n```ts\nold\n```\n### FILE: src/a.ts\n```ts\nnew\n```\n";

        let files = extract_file_blocks(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "new\n");
    }

    #[test]
    fn test_heading_inside_block_is_content() {
        let text = "### FILE: README.md\n```md\n### FILE: not-a-heading\n```\n";

        let files = extract_file_blocks(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "### FILE: not-a-heading\n");
    }

    #[test]
    fn test_longer_fence_keeps_inner_fences() {
        let text = "### FILE: README.md\n````md\n# Demo\n\n```bash\nnpm start\n```\n\nDone.\n````\n";

        let files = extract_file_blocks(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "# Demo\n\n```bash\nnpm start\n```\n\nDone.\n");
    }

    #[test]
    fn test_nested_example_in_same_length_fence() {
        let text = "### FILE: README.md\n```md\n## Usage\n```bash\nnpm test\n```\nEnd.\n```\n### FILE: src/a.ts\n```ts\nexport {};\n```\n";

        let files = extract_file_blocks(text);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].content, "## Usage\n```bash\nnpm test\n```\nEnd.\n");
        assert_eq!(files[1].content, "export {};\n");
    }

    #[test]
    fn test_current_dir_components_stripped() {
        let text = "### FILE: ./.forge/task.json\n```json\n{}\n```\n### FILE: src/./b.ts\n```ts\nb\n```\n";

        let paths: Vec<String> = extract_file_blocks(text).into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec![".forge/task.json", "src/b.ts"]);
    }

    #[test]
    fn test_no_blocks() {
        assert!(extract_file_blocks("I could not do that.").is_empty());
        assert!(extract_file_blocks("### FILE: empty.ts\nno fence here\n").is_empty());
    }
}
