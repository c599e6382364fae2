/// One control in the pagination bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLink {
    Previous { page: u32, href: String },
    Page { page: u32, href: String, active: bool },
    Ellipsis,
    Next { page: u32, href: String },
}

impl PageLink {
    pub fn href(&self) -> Option<&str> {
        match self {
            PageLink::Previous { href, .. }
            | PageLink::Page { href, .. }
            | PageLink::Next { href, .. } => Some(href),
            PageLink::Ellipsis => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PageLink::Page { active: true, .. })
    }
}

fn href(base_url: &str, page: u32) -> String {
    format!("{}&page={}", base_url, page)
}

/// Builds the pagination bar. `base_url` already carries its query
/// string; each link appends `&page=N`.
///
/// Layout: previous (page > 1), first, current (always, active),
/// ellipsis, last, next (page < page_count). First, ellipsis and last
/// only appear when there is more than one page.
pub fn page_links(page: u32, page_count: u32, base_url: &str) -> Vec<PageLink> {
    let mut links = Vec::new();
    let multi = page_count > 1;

    if page > 1 {
        links.push(PageLink::Previous {
            page: page - 1,
            href: href(base_url, page - 1),
        });
    }
    if multi {
        links.push(PageLink::Page {
            page: 1,
            href: href(base_url, 1),
            active: false,
        });
    }
    links.push(PageLink::Page {
        page,
        href: href(base_url, page),
        active: true,
    });
    if multi {
        links.push(PageLink::Ellipsis);
        links.push(PageLink::Page {
            page: page_count,
            href: href(base_url, page_count),
            active: false,
        });
    }
    if multi && page < page_count {
        links.push(PageLink::Next {
            page: page + 1,
            href: href(base_url, page + 1),
        });
    }
    links
}
