/// Console commands that change the installed-package library or load a
/// package under development. Namespaced and bare spellings both appear
/// because either form works at the console.
const REBUILD_TRIGGERS: &[&str] = &[
	"install.packages",
	"remove.packages",
	"devtools::install_github",
	"install_github",
	"devtools::load_all",
	"load_all",
];

/// Whether one observed console line should schedule an index rebuild.
///
/// Prefix match against the trimmed line, case-sensitive. Anything before
/// the command (a comment marker, an assignment) defeats the match.
pub(crate) fn triggers_rebuild(input: &str) -> bool {
	let trimmed = input.trim();
	REBUILD_TRIGGERS.iter().any(|command| trimmed.starts_with(command))
}
