mod comment;
mod insert;

pub use insert::{annotate_files, collect_comment_records};

#[cfg(test)]
use comment::render_comment;
#[cfg(test)]
use insert::{LineEnding, annotate_file, insert_comments, parse_line_number, split_lines};
