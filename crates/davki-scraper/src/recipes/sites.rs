use super::{PolitenessSpec, RecipeSpec, SelectorSpec, SiteRecipe};

const FU_GOV: RecipeSpec = RecipeSpec {
    name: "fu_gov",
    description: "Novice Finančne uprave RS (FURS)",
    source: "fu.gov.si",
    allowed_domains: &["fu.gov.si"],
    start_urls: &["https://www.fu.gov.si/novice/"],
    article_pattern: Some(r"/novice/.+"),
    selectors: SelectorSpec {
        article_links: &[
            ".news-list .news-item h3 a::attr(href)",
            ".news-list .news-item a.more::attr(href)",
            "article.news h2 a::attr(href)",
            "a.news-title::attr(href)",
        ],
        next_page: &[
            "ul.pagination li.next a::attr(href)",
            ".f3-widget-paginator li.next a::attr(href)",
            "a[rel=next]::attr(href)",
        ],
        title: &[
            "h1.news-title",
            "article.news h1",
            "h1",
            "meta[property='og:title']::attr(content)",
        ],
        content: &[
            ".news-single .news-text-wrap",
            ".news-content",
            "article .content",
            "main article",
        ],
        author: &[".news-author", "meta[name=author]::attr(content)"],
        date: &[
            ".news-single time::attr(datetime)",
            ".news-date",
            "time::attr(datetime)",
            ".date",
        ],
    },
    politeness: PolitenessSpec {
        download_delay: 2.0,
        concurrent_requests: 2,
    },
};

const GOV_SI: RecipeSpec = RecipeSpec {
    name: "gov_si",
    description: "Novice Ministrstva za finance na portalu GOV.SI",
    source: "gov.si",
    allowed_domains: &["gov.si"],
    start_urls: &["https://www.gov.si/drzavni-organi/ministrstva/ministrstvo-za-finance/novice/"],
    article_pattern: Some(r"/novice/\d{4}-\d{2}-\d{2}-"),
    selectors: SelectorSpec {
        article_links: &[
            ".news-list-item a.news-list-item__link::attr(href)",
            ".list-item h3 a::attr(href)",
            "article.news-item a::attr(href)",
        ],
        next_page: &[
            "a.pagination__next::attr(href)",
            "nav.pagination a[rel=next]::attr(href)",
            "a[rel=next]::attr(href)",
        ],
        title: &["h1.page-title", "article h1", "h1"],
        content: &[
            ".page-content .rich-text",
            ".article-content",
            "main .content",
            "main",
        ],
        author: &[".news-author", "meta[name=author]::attr(content)"],
        date: &[
            "time::attr(datetime)",
            ".news-date",
            ".date",
            "meta[property='article:published_time']::attr(content)",
        ],
    },
    politeness: PolitenessSpec {
        download_delay: 1.5,
        concurrent_requests: 2,
    },
};

const RACUNOVODJA: RecipeSpec = RecipeSpec {
    name: "racunovodja",
    description: "Strokovni članki portala Računovodja.com",
    source: "racunovodja.com",
    allowed_domains: &["racunovodja.com"],
    start_urls: &["https://www.racunovodja.com/clanki/"],
    article_pattern: None,
    selectors: SelectorSpec {
        article_links: &[
            "h2.entry-title a::attr(href)",
            "article .post-title a::attr(href)",
            ".article-list h3 a::attr(href)",
        ],
        next_page: &[
            "a.next.page-numbers::attr(href)",
            ".pagination a.next::attr(href)",
            "a[rel=next]::attr(href)",
        ],
        title: &[
            "h1.entry-title",
            "article h1",
            "h1",
            "meta[property='og:title']::attr(content)",
        ],
        content: &[".entry-content", "article .post-content", ".article-body"],
        author: &[
            ".author-name",
            ".entry-author a",
            "meta[name=author]::attr(content)",
        ],
        date: &[
            "time.entry-date::attr(datetime)",
            ".entry-date",
            "meta[property='article:published_time']::attr(content)",
        ],
    },
    politeness: PolitenessSpec {
        download_delay: 1.0,
        concurrent_requests: 4,
    },
};

pub fn fu_gov() -> SiteRecipe {
    SiteRecipe::new(&FU_GOV)
}

pub fn gov_si() -> SiteRecipe {
    SiteRecipe::new(&GOV_SI)
}

pub fn racunovodja() -> SiteRecipe {
    SiteRecipe::new(&RACUNOVODJA)
}
