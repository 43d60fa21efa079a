//! The built-in title catalog.
//!
//! Every entry is data: a filename template, a source description and a
//! verification policy. Adding a distribution means adding an entry
//! here, not a type.

use isokeep_source::{ReleaseVersionFrom, SourceDescriptor, VendorRule};
use isokeep_version::{FileTemplate, VersionStyle};

use crate::title::{ChecksumPolicy, TitleSpec};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

struct TitleBuilder {
    spec: TitleSpec,
}

impl TitleBuilder {
    fn new(name: &str, template: &str, source: SourceDescriptor) -> Self {
        // Catalog templates are fixed strings; a bad one is a programming
        // error caught by the catalog test below.
        let template = FileTemplate::new(template)
            .unwrap_or_else(|e| panic!("invalid catalog template for {name}: {e}"));
        Self {
            spec: TitleSpec {
                name: name.to_string(),
                template,
                source,
                style: VersionStyle::default(),
                checksum_policy: ChecksumPolicy::Require,
                checksum_url: None,
                signature: None,
                valid_editions: Vec::new(),
                valid_archs: Vec::new(),
                valid_langs: Vec::new(),
            },
        }
    }

    fn style(mut self, style: VersionStyle) -> Self {
        self.spec.style = style;
        self
    }

    fn editions(mut self, values: &[&str]) -> Self {
        self.spec.valid_editions = strings(values);
        self
    }

    fn langs(mut self, values: &[&str]) -> Self {
        self.spec.valid_langs = strings(values);
        self
    }

    fn checksum_url(mut self, url: &str) -> Self {
        self.spec.checksum_url = Some(url.to_string());
        self
    }

    fn accept_missing_checksum(mut self) -> Self {
        self.spec.checksum_policy = ChecksumPolicy::Accept;
        self
    }

    fn build(self) -> TitleSpec {
        self.spec
    }
}

/// All titles the engine knows how to keep current.
pub fn builtin_titles() -> Vec<TitleSpec> {
    vec![
        TitleBuilder::new(
            "ArchLinux",
            "archlinux-[[VER]]-x86_64.iso",
            SourceDescriptor::MirrorList {
                mirrors: strings(&[
                    "https://geo.mirror.pkgbuild.com/iso/latest",
                    "https://mirror.rackspace.com/archlinux/iso/latest",
                ]),
                file_pattern: r"archlinux-[0-9.]+-x86_64\.iso$".to_string(),
                version_pattern: r"archlinux-([0-9.]+)-x86_64\.iso$".to_string(),
                link_template: None,
            },
        )
        .style(VersionStyle::default().with_zero_pad(2))
        .build(),
        TitleBuilder::new(
            "Debian",
            "debian-live-[[VER]]-amd64-[[EDITION]].iso",
            SourceDescriptor::MirrorList {
                mirrors: strings(&[
                    "https://cdimage.debian.org/debian-cd/current-live/amd64/iso-hybrid",
                ]),
                file_pattern: r"debian-live-[0-9.]+-amd64-[[EDITION]]\.iso$".to_string(),
                version_pattern: r"debian-live-([0-9.]+)-amd64".to_string(),
                link_template: None,
            },
        )
        .editions(&[
            "cinnamon", "gnome", "kde", "lxde", "lxqt", "mate", "standard", "xfce",
        ])
        .build(),
        TitleBuilder::new(
            "Fedora",
            "Fedora-[[EDITION]]-Live-x86_64-[[VER]].iso",
            SourceDescriptor::VendorPage {
                url: "https://fedoraproject.org/spins/[[EDITION]]/download/".to_string(),
                rule: VendorRule::LinkRegex {
                    link_pattern:
                        r#"href="(https://download\.fedoraproject\.org/[^"]+x86_64[^"]+\.iso)""#
                            .to_string(),
                    version_pattern: Some(r"x86_64-([0-9][0-9.-]*)\.iso".to_string()),
                    checksum_pattern: None,
                },
            },
        )
        .style(VersionStyle::default().with_separator("-"))
        .editions(&["kde", "xfce", "cinnamon", "mate", "budgie", "sway", "lxde", "soas", "i3"])
        .accept_missing_checksum()
        .build(),
        TitleBuilder::new(
            "Ubuntu",
            "ubuntu-[[VER]]-desktop-amd64.iso",
            SourceDescriptor::MirrorList {
                mirrors: strings(&["https://releases.ubuntu.com"]),
                file_pattern: r"releases\.ubuntu\.com/[0-9][0-9.]*/$".to_string(),
                version_pattern: r"com/([0-9.]+)/$".to_string(),
                link_template: Some("[[VER]]/ubuntu-[[VER]]-desktop-amd64.iso".to_string()),
            },
        )
        .checksum_url("https://releases.ubuntu.com/[[VER]]/SHA256SUMS")
        .build(),
        TitleBuilder::new(
            "LinuxMint",
            "linuxmint-[[VER]]-[[EDITION]]-64bit.iso",
            SourceDescriptor::MirrorList {
                mirrors: strings(&["https://mirrors.edge.kernel.org/linuxmint/stable"]),
                file_pattern: r"/linuxmint/stable/[0-9][0-9.]*/$".to_string(),
                version_pattern: r"/stable/([0-9.]+)/$".to_string(),
                link_template: Some(
                    "[[VER]]/linuxmint-[[VER]]-[[EDITION]]-64bit.iso".to_string(),
                ),
            },
        )
        .editions(&["cinnamon", "mate", "xfce"])
        .checksum_url("https://mirrors.edge.kernel.org/linuxmint/stable/[[VER]]/sha256sum.txt")
        .build(),
        TitleBuilder::new(
            "MemTest86Plus",
            "mt86plus_[[VER]]_64.iso.zip",
            SourceDescriptor::MirrorList {
                mirrors: strings(&["https://www.memtest.org"]),
                file_pattern: r"mt86plus_[0-9.]+_64\.iso\.zip$".to_string(),
                version_pattern: r"mt86plus_([0-9.]+)_64\.iso\.zip$".to_string(),
                link_template: None,
            },
        )
        .accept_missing_checksum()
        .build(),
        TitleBuilder::new(
            "Rescuezilla",
            "rescuezilla-[[VER]]-64bit.[[EDITION]].iso",
            SourceDescriptor::ReleaseApi {
                repo: "rescuezilla/rescuezilla".to_string(),
                asset_pattern: r"rescuezilla-[0-9.]+-64bit\.[[EDITION]]\.iso$".to_string(),
                version_from: ReleaseVersionFrom::FileName,
                version_pattern: r"rescuezilla-([0-9.]+)-64bit".to_string(),
            },
        )
        .editions(&["bionic", "focal", "jammy", "noble"])
        .build(),
        TitleBuilder::new(
            "ShredOS",
            "shredos-[[VER]].img",
            SourceDescriptor::ReleaseApi {
                repo: "PartialVolume/shredos.x86_64".to_string(),
                asset_pattern: r"shredos-.*x86-64.*\.img$".to_string(),
                version_from: ReleaseVersionFrom::Tag,
                version_pattern: r"v([0-9.]+)".to_string(),
            },
        )
        // Digests live in the release notes text, not in an asset.
        .accept_missing_checksum()
        .build(),
        TitleBuilder::new(
            "SuperGrub2",
            "SuperGrub2-[[VER]].img",
            SourceDescriptor::VendorPage {
                url: "https://www.supergrubdisk.org/category/download/supergrub2diskdownload/"
                    .to_string(),
                rule: VendorRule::LinkRegex {
                    link_pattern:
                        r#"href="(https://sourceforge\.net/projects/supergrub2/files/[^"]*hybrid[^"]*\.img[^"]*)""#
                            .to_string(),
                    version_pattern: Some(
                        r"super_grub2_disk_hybrid_([0-9][0-9a-z.]*)\.img".to_string(),
                    ),
                    checksum_pattern: None,
                },
            },
        )
        .accept_missing_checksum()
        .build(),
        TitleBuilder::new(
            "SystemRescue",
            "systemrescue-[[VER]]-amd64.iso",
            SourceDescriptor::VendorPage {
                url: "https://www.system-rescue.org/Download".to_string(),
                rule: VendorRule::LinkRegex {
                    link_pattern:
                        r#"href="(https://fastly-cdn\.system-rescue\.org/releases/[^"]+-amd64\.iso)""#
                            .to_string(),
                    version_pattern: Some(r"/releases/([0-9.]+)/".to_string()),
                    checksum_pattern: None,
                },
            },
        )
        .checksum_url(
            "https://www.system-rescue.org/releases/[[VER]]/systemrescue-[[VER]]-amd64.iso.sha256",
        )
        .build(),
        TitleBuilder::new(
            "TempleOS",
            "TempleOS_[[EDITION]]_[[VER]].ISO",
            SourceDescriptor::MirrorList {
                mirrors: strings(&["https://templeos.org/Downloads"]),
                file_pattern: r"TempleOS_[[EDITION]]_[0-9.]+\.ISO$".to_string(),
                version_pattern: r"TempleOS_.+_([0-9.]+)\.ISO$".to_string(),
                link_template: None,
            },
        )
        .editions(&["Distro", "Lite"])
        .checksum_url("https://templeos.org/Downloads/md5sums.txt")
        .build(),
        TitleBuilder::new(
            "Windows11",
            "Win11_[[VER]]_[[LANG]]_x64v2.iso",
            SourceDescriptor::VendorPage {
                url: "https://www.microsoft.com/en-us/software-download/windows11".to_string(),
                rule: VendorRule::LinkRegex {
                    link_pattern:
                        r#"href="(https://software\.download\.prss\.microsoft\.com/[^"]+\.iso[^"]*)""#
                            .to_string(),
                    version_pattern: Some(r"Version ([0-9]{2}H[0-9])".to_string()),
                    checksum_pattern: None,
                },
            },
        )
        .langs(&["English", "EnglishInternational"])
        .accept_missing_checksum()
        .build(),
    ]
}

/// Look a title up by its canonical name, case-insensitively.
pub fn find_title(name: &str) -> Option<TitleSpec> {
    builtin_titles()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds_and_names_are_unique() {
        let titles = builtin_titles();
        assert_eq!(titles.len(), 12);
        let mut names: Vec<&str> = titles.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(find_title("debian").is_some());
        assert!(find_title("MEMTEST86PLUS").is_some());
        assert!(find_title("TailsOS").is_none());
    }

    #[test]
    fn edition_templates_declare_their_editions() {
        for title in builtin_titles() {
            if title.template.has_edition() {
                assert!(
                    !title.valid_editions.is_empty(),
                    "{} renders an edition but lists none",
                    title.name
                );
            }
            if title.template.has_lang() {
                assert!(!title.valid_langs.is_empty());
            }
        }
    }
}
