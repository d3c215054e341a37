use crate::cursor::Cursor;
use crate::model::Version;

use super::Source;

/// The first `#version N [profile]` line.
pub(crate) fn scan_version(src: &Source<'_>) -> Option<Version> {
    src.clean().lines().find_map(|line| {
        let directive = line.trim();
        let rest = directive.strip_prefix('#')?;
        let mut cur = Cursor::at(rest, 0);
        if !cur.keyword("version") {
            return None;
        }
        let number = cur.number()?;
        let profile = cur.one_of(&["core", "compatibility", "es"]).map(str::to_string);
        Some(Version { number, profile, full_text: directive.to_string() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_number_and_profile() {
        let v = scan_version(&Source::new("\n  #version 450 core\n#vertex")).unwrap();
        assert_eq!(v.number, 450);
        assert_eq!(v.profile.as_deref(), Some("core"));
        assert_eq!(v.full_text, "#version 450 core");
    }

    #[test]
    fn commented_version_is_ignored() {
        assert_eq!(scan_version(&Source::new("// #version 330\nvoid main(){}")), None);
    }
}
