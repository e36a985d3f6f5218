/// Glyph drawn in front of the first visual row of the input block.
pub(crate) const PROMPT_PREFIX: &str = "> ";

/// Columns reserved in front of every visual row of the input block.
/// Continuation rows get this many spaces so wrapped input stays aligned
/// with the text after the prompt glyph.
pub(crate) const INPUT_PREFIX_COLS: usize = 2;

/// Indent for secondary lines inside a transcript block (tool output,
/// thinking bodies and similar).
pub(crate) const BLOCK_INDENT: &str = "  ";

/// Spinner frames for the activity line, advanced once per animation tick.
pub(crate) const SPINNER_FRAMES: [&str; 10] =
    ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
