use story_stream::{
    MemoryHistory, Player, PlayerOptions, RecordingPresentation, SourceRenderer, Story,
};

pub type HeadlessPlayer = Player<SourceRenderer, RecordingPresentation, MemoryHistory>;

/// `(pid, name, tags, source)`; source is written as-is, so escape markup.
pub type PassageSpec<'a> = (u32, &'a str, &'a str, &'a str);

/// Four-passage story with a colophon: Start -> Room -> End.
pub const CAVE: &[PassageSpec<'static>] = &[
    (1, "Start", "", "You wake in a cave. [[Room]]"),
    (2, "Room", "", "A low room. [[End]] or [[Start]]"),
    (3, "End", "end", "Daylight."),
    (4, "StoryColophon", "", "&lt;p&gt;Thanks for playing&lt;/p&gt;"),
];

/// Build a Twine 2 archive page around `passages`.
pub fn twine2_archive(name: &str, start: u32, passages: &[PassageSpec<'_>]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>story</title></head><body>\n",
    );
    html.push_str(&format!(
        "<tw-storydata name=\"{}\" startnode=\"{}\" creator=\"Twine\" creator-version=\"2.6.2\" format=\"Paloma\" hidden>\n",
        name, start
    ));
    html.push_str(
        "<style role=\"stylesheet\" id=\"twine-user-stylesheet\" type=\"text/twine-css\">.passage { margin: 1em; }</style>\n",
    );
    html.push_str(
        "<script role=\"script\" id=\"twine-user-script\" type=\"text/twine-javascript\">story.state.visits = 0;</script>\n",
    );
    for (pid, name, tags, source) in passages {
        html.push_str(&format!(
            "<tw-passagedata pid=\"{}\" name=\"{}\" tags=\"{}\" position=\"{},100\">{}</tw-passagedata>\n",
            pid,
            name,
            tags,
            pid * 100,
            source
        ));
    }
    html.push_str("</tw-storydata>\n</body></html>\n");
    html
}

pub fn cave_story() -> Story {
    Story::from_html(twine2_archive("Cave", 1, CAVE).as_bytes())
        .unwrap_or_else(|e| panic!("cave fixture failed to load: {}", e))
}

pub fn headless(story: Story, options: PlayerOptions) -> HeadlessPlayer {
    Player::new(
        story,
        options,
        SourceRenderer,
        RecordingPresentation::new(),
        MemoryHistory::new(),
    )
}

/// Linear chain of `count` passages, each linking to the next.
pub fn chain_story(count: u32) -> Story {
    let passages: Vec<String> = (1..=count)
        .map(|id| format!("Passage {} leads on. [[P{}]]", id, id + 1))
        .collect();
    let names: Vec<String> = (1..=count).map(|id| format!("P{}", id)).collect();
    let specs: Vec<PassageSpec<'_>> = (0..count as usize)
        .map(|i| (i as u32 + 1, names[i].as_str(), "", passages[i].as_str()))
        .collect();
    Story::from_html(twine2_archive("Chain", 1, &specs).as_bytes())
        .unwrap_or_else(|e| panic!("chain fixture failed to load: {}", e))
}
