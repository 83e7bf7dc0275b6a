//! Schema of one `<PubmedArticle>` record, limited to the fields a citation uses
//!
//! Every element is optional: records range from full MEDLINE entries to
//! publisher-supplied stubs, and absence is normal rather than an error.

use serde::Deserialize;

use super::deserializers::{TextContent, deserialize_bool_yn};
use crate::pubmed::models::{Journal, Pagination, PublicationDate, Subject};

#[derive(Debug, Deserialize)]
pub(super) struct PubmedArticleXml {
    #[serde(rename = "MedlineCitation", default)]
    pub medline_citation: Option<MedlineCitationXml>,
    #[serde(rename = "PubmedData", default)]
    pub pubmed_data: Option<PubmedDataXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MedlineCitationXml {
    #[serde(rename = "@Status", default)]
    pub status: Option<String>,
    #[serde(rename = "PMID", default)]
    pub pmid: Option<PmidXml>,
    #[serde(rename = "Article", default)]
    pub article: Option<ArticleXml>,
    #[serde(rename = "MedlineJournalInfo", default)]
    pub journal_info: Option<MedlineJournalInfoXml>,
    #[serde(rename = "MeshHeadingList", default)]
    pub mesh_heading_list: Option<MeshHeadingListXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PmidXml {
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArticleXml {
    #[serde(rename = "Journal", default)]
    pub journal: Option<JournalXml>,
    #[serde(rename = "ArticleTitle", default)]
    pub title: Option<TextContent>,
    #[serde(rename = "Pagination", default)]
    pub pagination: Option<PaginationXml>,
    #[serde(rename = "Abstract", default)]
    pub abstract_section: Option<AbstractXml>,
    /// Pre-2014 records carry a single article-level affiliation
    #[serde(rename = "Affiliation", default)]
    pub affiliation: Option<TextContent>,
    #[serde(rename = "AuthorList", default)]
    pub author_list: Option<AuthorListXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct JournalXml {
    #[serde(rename = "ISSN", default)]
    pub issns: Vec<IssnXml>,
    #[serde(rename = "JournalIssue", default)]
    pub journal_issue: Option<JournalIssueXml>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct IssnXml {
    #[serde(rename = "$text", default)]
    pub value: String,
    #[serde(rename = "@IssnType", default)]
    pub issn_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct JournalIssueXml {
    #[serde(rename = "Volume", default)]
    pub volume: Option<String>,
    #[serde(rename = "Issue", default)]
    pub issue: Option<String>,
    #[serde(rename = "PubDate", default)]
    pub pub_date: Option<PubDateXml>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PubDateXml {
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "Month", default)]
    pub month: Option<String>,
    #[serde(rename = "Day", default)]
    pub day: Option<String>,
    #[serde(rename = "Season", default)]
    pub season: Option<String>,
    #[serde(rename = "MedlineDate", default)]
    pub medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PaginationXml {
    #[serde(rename = "MedlinePgn", default)]
    pub medline_pgn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AbstractXml {
    #[serde(rename = "AbstractText", default)]
    pub sections: Vec<TextContent>,
    #[serde(rename = "CopyrightInformation", default)]
    pub copyright: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthorListXml {
    #[serde(rename = "Author", default)]
    pub authors: Vec<AuthorXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthorXml {
    /// "N" marks an author entry withdrawn by an erratum
    #[serde(rename = "@ValidYN", default)]
    pub valid_yn: Option<String>,
    #[serde(rename = "LastName", default)]
    pub last_name: Option<String>,
    #[serde(rename = "ForeName", default)]
    pub fore_name: Option<String>,
    #[serde(rename = "Initials", default)]
    pub initials: Option<String>,
    #[serde(rename = "AffiliationInfo", default)]
    pub affiliation_info: Vec<AffiliationInfoXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AffiliationInfoXml {
    #[serde(rename = "Affiliation", default)]
    pub affiliation: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MedlineJournalInfoXml {
    #[serde(rename = "MedlineTA", default)]
    pub medline_ta: Option<String>,
    #[serde(rename = "NlmUniqueID", default)]
    pub nlm_unique_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MeshHeadingListXml {
    #[serde(rename = "MeshHeading", default)]
    pub headings: Vec<MeshHeadingXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MeshHeadingXml {
    #[serde(rename = "DescriptorName", default)]
    pub descriptor: Option<MeshNameXml>,
    #[serde(rename = "QualifierName", default)]
    pub qualifiers: Vec<MeshNameXml>,
}

/// `DescriptorName` or `QualifierName`
#[derive(Debug, Deserialize)]
pub(super) struct MeshNameXml {
    #[serde(rename = "$text", default)]
    pub name: String,
    #[serde(
        rename = "@MajorTopicYN",
        default,
        deserialize_with = "deserialize_bool_yn"
    )]
    pub major_topic: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct PubmedDataXml {
    #[serde(rename = "History", default)]
    pub history: Option<HistoryXml>,
    #[serde(rename = "PublicationStatus", default)]
    pub publication_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryXml {
    #[serde(rename = "PubMedPubDate", default)]
    pub dates: Vec<PubMedPubDateXml>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PubMedPubDateXml {
    #[serde(rename = "@PubStatus", default)]
    pub pub_status: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "Month", default)]
    pub month: Option<String>,
    #[serde(rename = "Day", default)]
    pub day: Option<String>,
}

fn text(value: Option<&String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn content(value: Option<&TextContent>) -> String {
    value.map(TextContent::normalized).unwrap_or_default()
}

impl PubmedArticleXml {
    pub fn pmid(&self) -> String {
        text(
            self.medline_citation
                .as_ref()
                .and_then(|c| c.pmid.as_ref())
                .map(|p| &p.value),
        )
    }

    fn article(&self) -> Option<&ArticleXml> {
        self.medline_citation.as_ref()?.article.as_ref()
    }

    fn journal_issue(&self) -> Option<&JournalIssueXml> {
        self.article()?.journal.as_ref()?.journal_issue.as_ref()
    }

    pub fn title(&self) -> String {
        content(self.article().and_then(|a| a.title.as_ref()))
    }

    /// Sections of a structured abstract are joined with a space
    pub fn abstract_text(&self) -> String {
        self.article()
            .and_then(|a| a.abstract_section.as_ref())
            .map(|abs| {
                abs.sections
                    .iter()
                    .map(TextContent::normalized)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    pub fn abstract_copyright(&self) -> String {
        content(
            self.article()
                .and_then(|a| a.abstract_section.as_ref())
                .and_then(|abs| abs.copyright.as_ref()),
        )
    }

    fn authors(&self) -> &[AuthorXml] {
        self.article()
            .and_then(|a| a.author_list.as_ref())
            .map(|list| list.authors.as_slice())
            .unwrap_or_default()
    }

    pub fn author_names(&self) -> Vec<String> {
        self.authors().iter().filter_map(AuthorXml::display_name).collect()
    }

    /// Article-level affiliation, else the first author affiliation in the record
    pub fn affiliation(&self) -> String {
        let legacy = content(self.article().and_then(|a| a.affiliation.as_ref()));
        if !legacy.is_empty() {
            return legacy;
        }

        self.authors()
            .iter()
            .flat_map(|author| author.affiliation_info.iter())
            .map(|info| content(info.affiliation.as_ref()))
            .find(|affiliation| !affiliation.is_empty())
            .unwrap_or_default()
    }

    pub fn journal(&self) -> Journal {
        let journal = self.article().and_then(|a| a.journal.as_ref());
        let info = self
            .medline_citation
            .as_ref()
            .and_then(|c| c.journal_info.as_ref());

        let issn = |issn_type: &str| {
            journal
                .and_then(|j| {
                    j.issns
                        .iter()
                        .find(|issn| issn.issn_type.as_deref() == Some(issn_type))
                })
                .map(|issn| issn.value.trim().to_string())
                .unwrap_or_default()
        };

        Journal {
            name: text(journal.and_then(|j| j.title.as_ref())),
            abbreviated_name: text(info.and_then(|i| i.medline_ta.as_ref())),
            issn_online: issn("Electronic"),
            issn_print: issn("Print"),
            nlm_unique_id: text(info.and_then(|i| i.nlm_unique_id.as_ref())),
        }
    }

    pub fn pagination(&self) -> Pagination {
        let issue = self.journal_issue();
        Pagination {
            volume: text(issue.and_then(|i| i.volume.as_ref())),
            issue: text(issue.and_then(|i| i.issue.as_ref())),
            pages: text(
                self.article()
                    .and_then(|a| a.pagination.as_ref())
                    .and_then(|p| p.medline_pgn.as_ref()),
            ),
        }
    }

    /// Raw date inputs, including the `pubmed` history date
    pub fn publication_date(&self) -> PublicationDate {
        let pub_date = self.journal_issue().and_then(|i| i.pub_date.as_ref());
        let history = self
            .pubmed_data
            .as_ref()
            .and_then(|d| d.history.as_ref())
            .and_then(|h| {
                h.dates
                    .iter()
                    .find(|date| date.pub_status.as_deref() == Some("pubmed"))
            });

        PublicationDate {
            year: text(pub_date.and_then(|d| d.year.as_ref())),
            month: text(pub_date.and_then(|d| d.month.as_ref())),
            day: text(pub_date.and_then(|d| d.day.as_ref())),
            season: text(pub_date.and_then(|d| d.season.as_ref())),
            medline_date: text(pub_date.and_then(|d| d.medline_date.as_ref())),
            history_year: text(history.and_then(|h| h.year.as_ref())),
            history_month: text(history.and_then(|h| h.month.as_ref())),
            history_day: text(history.and_then(|h| h.day.as_ref())),
        }
    }

    /// One subject per descriptor, followed by one per qualifier under it
    pub fn subjects(&self) -> Vec<Subject> {
        let headings = self
            .medline_citation
            .as_ref()
            .and_then(|c| c.mesh_heading_list.as_ref())
            .map(|list| list.headings.as_slice())
            .unwrap_or_default();

        let mut subjects = Vec::new();
        for heading in headings {
            let Some(descriptor) = &heading.descriptor else {
                continue;
            };
            let name = descriptor.name.trim();

            subjects.push(Subject {
                name: name.to_string(),
                qualifier: String::new(),
                is_major_topic: descriptor.major_topic,
            });
            subjects.extend(heading.qualifiers.iter().map(|qualifier| Subject {
                name: name.to_string(),
                qualifier: qualifier.name.trim().to_string(),
                is_major_topic: qualifier.major_topic,
            }));
        }
        subjects
    }

    pub fn publication_status(&self) -> String {
        text(
            self.pubmed_data
                .as_ref()
                .and_then(|d| d.publication_status.as_ref()),
        )
    }

    pub fn medline_status(&self) -> String {
        text(self.medline_citation.as_ref().and_then(|c| c.status.as_ref()))
    }
}

impl AuthorXml {
    /// "Smith JA", or "Smith John A" without initials.
    ///
    /// `None` for invalid entries and for authors without a last name
    /// (collective names).
    pub fn display_name(&self) -> Option<String> {
        if self.valid_yn.as_deref().map(str::trim) == Some("N") {
            return None;
        }

        let last_name = text(self.last_name.as_ref());
        if last_name.is_empty() {
            return None;
        }

        let initials = text(self.initials.as_ref());
        let given = if initials.is_empty() {
            text(self.fore_name.as_ref())
        } else {
            initials
        };

        if given.is_empty() {
            Some(last_name)
        } else {
            Some(format!("{} {}", last_name, given))
        }
    }
}
