// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use trinity_app::ItemDraft;

struct DemoEntry {
    name: &'static str,
    name_en: &'static str,
    field: &'static str,
    elements: [&'static str; 3],
    sacrifices: [&'static str; 3],
    description: &'static str,
    hyperlink: &'static str,
}

const DEMO_ENTRIES: &[DemoEntry] = &[
    DemoEntry {
        name: "Mundell-Fleming Trilemma",
        name_en: "Impossible Trinity of International Finance",
        field: "Economics",
        elements: [
            "Fixed exchange rate",
            "Free capital movement",
            "Independent monetary policy",
        ],
        sacrifices: [
            "The currency floats and absorbs external shocks.",
            "Capital controls limit cross-border investment.",
            "Interest rates track the anchor currency's central bank.",
        ],
        description: "A country cannot keep a fixed exchange rate, allow capital to move freely and run its own monetary policy all at once. Any two are achievable; the third has to give.",
        hyperlink: "https://en.wikipedia.org/wiki/Impossible_trinity",
    },
    DemoEntry {
        name: "CAP Theorem",
        name_en: "Brewer's Theorem",
        field: "Computer Science",
        elements: ["Consistency", "Availability", "Partition tolerance"],
        sacrifices: [
            "Readers may observe stale data.",
            "Some requests are refused during a partition.",
            "",
        ],
        description: "A distributed data store facing a network partition must choose between answering every request and answering every request with the latest write.",
        hyperlink: "https://en.wikipedia.org/wiki/CAP_theorem",
    },
    DemoEntry {
        name: "Project Management Triangle",
        name_en: "Iron Triangle",
        field: "Management",
        elements: ["Fast", "Good", "Cheap"],
        sacrifices: [
            "The schedule slips.",
            "Quality drops.",
            "The budget grows.",
        ],
        description: "Scope, schedule and cost constrain each other; tightening one loosens another.",
        hyperlink: "https://en.wikipedia.org/wiki/Project_management_triangle",
    },
    DemoEntry {
        name: "Zooko's Triangle",
        name_en: "",
        field: "Computer Science",
        elements: ["Human-meaningful", "Secure", "Decentralized"],
        sacrifices: ["", "", ""],
        description: "Names in a naming system can have at most two of the three properties.",
        hyperlink: "https://en.wikipedia.org/wiki/Zooko%27s_triangle",
    },
    DemoEntry {
        name: "Blockchain Trilemma",
        name_en: "Scalability Trilemma",
        field: "Computer Science",
        elements: ["Decentralization", "Security", "Scalability"],
        sacrifices: [
            "Block production concentrates in few hands.",
            "Attacks become cheaper.",
            "Throughput stays low.",
        ],
        description: "",
        hyperlink: "",
    },
    DemoEntry {
        name: "Political Trilemma of the World Economy",
        name_en: "Rodrik's Trilemma",
        field: "Economics",
        elements: [
            "Hyperglobalization",
            "Democratic politics",
            "National sovereignty",
        ],
        sacrifices: [
            "Markets stay partly national.",
            "Policy is set by technocrats.",
            "Rules move to a global federalism.",
        ],
        description: "Deep economic integration, democracy and the nation state cannot all be pursued at full strength.",
        hyperlink: "https://en.wikipedia.org/wiki/Rodrik%27s_trilemma",
    },
    DemoEntry {
        name: "Energy Trilemma",
        name_en: "",
        field: "Energy",
        elements: ["Security of supply", "Affordability", "Sustainability"],
        sacrifices: [
            "Blackouts become more likely.",
            "Bills rise.",
            "Emissions rise.",
        ],
        description: "Energy policy balances reliable supply, cost to consumers and environmental impact.",
        hyperlink: "",
    },
    DemoEntry {
        name: "Student Trilemma",
        name_en: "",
        field: "Life",
        elements: ["Good grades", "Social life", "Enough sleep"],
        sacrifices: ["", "", ""],
        description: "",
        hyperlink: "",
    },
];

pub(crate) fn demo_drafts() -> Vec<ItemDraft> {
    DEMO_ENTRIES
        .iter()
        .map(|entry| {
            let mut draft = ItemDraft::new(entry.name, entry.field, entry.elements);
            draft.name_en = entry.name_en.to_owned();
            draft.description = entry.description.to_owned();
            draft.hyperlink = entry.hyperlink.to_owned();
            draft.element1_sacrifice_explanation = entry.sacrifices[0].to_owned();
            draft.element2_sacrifice_explanation = entry.sacrifices[1].to_owned();
            draft.element3_sacrifice_explanation = entry.sacrifices[2].to_owned();
            draft
        })
        .collect()
}
