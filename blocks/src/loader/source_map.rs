use std::collections::HashMap;
use std::ops::Range;

use regex::Regex;

use crate::ids::BlockId;

/// Maps `"id": "..."` entries in program JSON back to byte spans,
/// so diagnostics about a block can point at it in the file.
///
/// Objects carrying a `"type"` key are blocks; ids of workspaces and
/// registry entries are indexed separately so they never shadow a block.
#[derive(Debug, Default)]
pub struct SourceMap {
    blocks: HashMap<String, Vec<Range<usize>>>,
    others: HashMap<String, Vec<Range<usize>>>,
}

enum Frame {
    Array,
    Object(Entry),
}

#[derive(Default)]
struct Entry {
    id: Option<(String, Range<usize>)>,
    is_block: bool,
    expect_key: bool,
    /// Key awaiting its value, with the span start of the key.
    key: Option<(String, usize)>,
}

impl SourceMap {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        // Strings and structural characters; everything else is a scalar
        // the index does not need.
        let token_re = Regex::new(r#""(?P<text>(?:[^"\\]|\\.)*)"|(?P<punct>[{}\[\]:,])"#)?;

        let mut map = SourceMap::default();
        let mut stack: Vec<Frame> = Vec::new();
        for caps in token_re.captures_iter(source) {
            if let Some(punct) = caps.name("punct") {
                match punct.as_str() {
                    "{" => {
                        take_value(&mut stack);
                        stack.push(Frame::Object(Entry {
                            expect_key: true,
                            ..Entry::default()
                        }));
                    }
                    "[" => {
                        take_value(&mut stack);
                        stack.push(Frame::Array);
                    }
                    "}" => {
                        if let Some(Frame::Object(entry)) = stack.pop() {
                            map.record(entry);
                        }
                    }
                    "]" => {
                        stack.pop();
                    }
                    "," => {
                        if let Some(Frame::Object(entry)) = stack.last_mut() {
                            entry.expect_key = true;
                            entry.key = None;
                        }
                    }
                    ":" => {
                        if let Some(Frame::Object(entry)) = stack.last_mut() {
                            entry.expect_key = false;
                        }
                    }
                    _ => {}
                }
            } else if let (Some(whole), Some(text)) = (caps.get(0), caps.name("text")) {
                let Some(Frame::Object(entry)) = stack.last_mut() else {
                    continue;
                };
                if entry.expect_key {
                    entry.key = Some((text.as_str().to_string(), whole.start()));
                    continue;
                }
                match entry.key.take() {
                    Some((key, start)) if key == "id" => {
                        entry.id = Some((text.as_str().to_string(), start..whole.end()));
                    }
                    Some((key, _)) if key == "type" => entry.is_block = true,
                    _ => {}
                }
            }
        }
        // Objects are recorded as they close, so nested ones come first.
        for spans in map.blocks.values_mut().chain(map.others.values_mut()) {
            spans.sort_by_key(|span| span.start);
        }
        Ok(map)
    }

    fn record(&mut self, entry: Entry) {
        let Some((id, span)) = entry.id else {
            return;
        };
        let index = if entry.is_block {
            &mut self.blocks
        } else {
            &mut self.others
        };
        index.entry(id).or_default().push(span);
    }

    /// Span of the block with this id, falling back to any other entry
    /// carrying it.
    pub fn span_of(&self, id: &BlockId) -> Option<Range<usize>> {
        self.occurrences(id.as_str())
            .first()
            .or_else(|| self.others.get(id.as_str()).and_then(|spans| spans.first()))
            .cloned()
    }

    /// Every block carrying `id`, in source order.
    pub fn occurrences(&self, id: &str) -> &[Range<usize>] {
        self.blocks.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A nested container is the value of the pending key, if any.
fn take_value(stack: &mut [Frame]) {
    if let Some(Frame::Object(entry)) = stack.last_mut() {
        entry.key = None;
    }
}
