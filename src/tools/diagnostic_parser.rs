//! 解碼器診斷文字解析器
//!
//! `ffmpeg -hide_banner -i <path>` 在沒有輸出參數時，會把輸入檔案的
//! 中繼資料以診斷文字印在 stderr。本模組以逐行狀態機將該文字解析為
//! 結構化的影片中繼資料：時長、畫面尺寸、幀率、位元率、串流、章節
//! 與自由格式標籤。
//!
//! 狀態機容許缺欄位，缺什麼由呼叫端（media_probe）決定是否致命。

use anyhow::Result;
use log::debug;
use regex::Regex;
use std::collections::HashMap;

/// 幀率欄位的偏好來源；另一個來源作為解析失敗時的後備
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FpsSource {
    /// 明確的 `fps` 標記
    #[default]
    Fps,
    /// 解碼器回報的基準速率 `tbr`
    Tbr,
}

impl FpsSource {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fps" => Some(Self::Fps),
            "tbr" => Some(Self::Tbr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Other(String),
}

impl StreamKind {
    fn from_word(word: &str) -> Self {
        match word {
            "Video" => Self::Video,
            "Audio" => Self::Audio,
            "Subtitle" => Self::Subtitle,
            "Data" => Self::Data,
            "Attachment" => Self::Attachment,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub input_number: u32,
    pub stream_number: u32,
    pub kind: StreamKind,
    /// `und` 語言對應到 None
    pub language: Option<String>,
    pub is_default: bool,
    pub size: Option<(u32, u32)>,
    pub fps: Option<f64>,
    pub bitrate_kbps: Option<u32>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ChapterInfo {
    pub input_number: u32,
    pub chapter_number: u32,
    pub start: f64,
    pub end: f64,
    pub metadata: HashMap<String, String>,
}

/// 一個輸入檔案的串流與章節群組
#[derive(Debug, Clone, Default)]
pub struct InputFileInfo {
    pub input_number: u32,
    pub streams: Vec<StreamInfo>,
    pub chapters: Vec<ChapterInfo>,
}

/// 解析結果
///
/// `video_size`、`video_fps`、`video_bitrate_kbps` 是片段層級的欄位，
/// 只取預設串流的值，或在尚未設定時取第一個出現的值。
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    /// 沒有視訊串流時為 None
    pub duration: Option<f64>,
    /// 容器層級位元率（`Duration:` 行）
    pub bitrate_kbps: Option<u32>,
    pub video_size: Option<(u32, u32)>,
    pub video_fps: Option<f64>,
    pub video_bitrate_kbps: Option<u32>,
    /// floor(duration · fps)；沒有視訊串流時為 1
    pub frame_count: u64,
    pub has_video: bool,
    pub has_audio: bool,
    /// 檔案層級標籤；重複的鍵以換行附加
    pub metadata: HashMap<String, String>,
    pub inputs: Vec<InputFileInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    ScanningInput,
    InFileMetadata,
    InStream,
    InStreamMetadata,
    InChapter,
    InChapterMetadata,
    InOutput,
}

/// 預設串流標記的來源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultOrigin {
    /// 同類型的第一個串流，沒有明確標記時的推定
    Inferred,
    /// 診斷文字中帶 `(default)` 標記
    Explicit,
}

struct ParseContext {
    state: ParserState,
    fps_source: FpsSource,
    check_duration: bool,
    raw_duration: Option<f64>,
    /// 最後一個 `time=` 進度標記
    decode_time: Option<f64>,
    info: MediaInfo,
    inputs: Vec<InputFileInfo>,
    current_input: Option<InputFileInfo>,
    current_stream: Option<StreamInfo>,
    current_chapter: Option<ChapterInfo>,
    /// 每種類型目前的預設串流是推定的還是明確標記的
    defaults_seen: HashMap<StreamKind, DefaultOrigin>,
    /// 中繼資料續行所附加的前一個鍵
    last_metadata_key: Option<String>,
}

/// 解析解碼器的診斷輸出
///
/// `check_duration` 為 true 時，偏好解碼輸出中最後一個 `time=` 進度
/// 標記作為時長（容器時長不可靠時使用）。
pub fn parse_diagnostics(
    text: &str,
    fps_source: FpsSource,
    check_duration: bool,
) -> Result<MediaInfo> {
    let patterns = Patterns::new()?;
    let mut ctx = ParseContext {
        state: ParserState::ScanningInput,
        fps_source,
        check_duration,
        raw_duration: None,
        decode_time: None,
        info: MediaInfo::default(),
        inputs: Vec::new(),
        current_input: None,
        current_stream: None,
        current_chapter: None,
        defaults_seen: HashMap::new(),
        last_metadata_key: None,
    };

    for line in text.lines() {
        ctx.feed_line(line, &patterns);
    }

    ctx.finalize()
}

struct Patterns {
    stream: Regex,
    chapter: Regex,
    duration: Regex,
    time_marker: Regex,
    size: Regex,
    kbps: Regex,
    fps: Regex,
    tbr: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            stream: Regex::new(
                r"^\s+Stream #(\d+):(\d+)(?:\[0x[0-9a-fA-F]+\])?(?:\(([^)]*)\))?: (\w+): (.*)$",
            )?,
            chapter: Regex::new(r"^\s+Chapter #(\d+):(\d+): start ([\d.]+), end ([\d.]+)")?,
            duration: Regex::new(r"(\d{2,}):(\d{2}):(\d{2})\.(\d{2})")?,
            time_marker: Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2})\.(\d{2})")?,
            size: Regex::new(r"^(\d+)x(\d+)")?,
            kbps: Regex::new(r"(\d+) kb/s")?,
            fps: Regex::new(r"([\d.]+)\s+fps")?,
            tbr: Regex::new(r"([\d.]+k?)\s+tbr")?,
        })
    }
}

impl ParseContext {
    fn feed_line(&mut self, line: &str, patterns: &Patterns) {
        // 解碼進度行（frame= ... time=00:00:21.93 ...）可能出現在
        // Output 段之後，必須先於狀態判斷處理
        // 進度行可能以歸位字元分隔多次更新，取同一行裡最後的標記
        if self.check_duration
            && let Some(caps) = patterns.time_marker.captures_iter(line).last()
        {
            self.decode_time = clock_to_seconds(&caps);
            return;
        }

        if self.state == ParserState::InOutput {
            return;
        }

        let trimmed = line.trim();

        if trimmed.starts_with("Output #") {
            self.flush_stream();
            self.flush_chapter();
            self.state = ParserState::InOutput;
            return;
        }

        if trimmed.starts_with("Input #") {
            self.state = ParserState::ScanningInput;
            self.last_metadata_key = None;
            return;
        }

        if trimmed == "Metadata:" {
            self.state = match self.state {
                ParserState::InStream | ParserState::InStreamMetadata => {
                    ParserState::InStreamMetadata
                }
                ParserState::InChapter | ParserState::InChapterMetadata => {
                    ParserState::InChapterMetadata
                }
                _ => ParserState::InFileMetadata,
            };
            self.last_metadata_key = None;
            return;
        }

        // 章節清單的標頭行，本身不帶資料
        if trimmed == "Chapters:" {
            return;
        }

        if trimmed.starts_with("Duration:") {
            if !trimmed.contains("N/A") {
                self.raw_duration = patterns
                    .duration
                    .captures(trimmed)
                    .and_then(|caps| clock_to_seconds(&caps));
            }
            self.info.bitrate_kbps = patterns
                .kbps
                .captures(trimmed)
                .and_then(|caps| caps[1].parse().ok());
            return;
        }

        if let Some(caps) = patterns.stream.captures(line) {
            self.start_stream(&caps, line, patterns);
            return;
        }

        if let Some(caps) = patterns.chapter.captures(line) {
            self.start_chapter(&caps);
            return;
        }

        match self.state {
            ParserState::InFileMetadata => self.metadata_line(trimmed, MetadataTarget::File),
            ParserState::InStreamMetadata => self.metadata_line(trimmed, MetadataTarget::Stream),
            ParserState::InChapterMetadata => self.metadata_line(trimmed, MetadataTarget::Chapter),
            _ => {}
        }
    }

    fn start_stream(&mut self, caps: &regex::Captures<'_>, line: &str, patterns: &Patterns) {
        self.flush_stream();
        self.flush_chapter();

        let input_number: u32 = caps[1].parse().unwrap_or(0);
        let stream_number: u32 = caps[2].parse().unwrap_or(0);
        let language = caps
            .get(3)
            .map(|m| m.as_str())
            .filter(|lang| !lang.is_empty() && *lang != "und")
            .map(ToString::to_string);
        let kind = StreamKind::from_word(&caps[4]);
        let detail = &caps[5];

        // 明確標記為預設，或是同類型的第一個串流
        let explicit = line.contains("(default)");
        let is_default = explicit || !self.defaults_seen.contains_key(&kind);
        if explicit {
            // 明確標記出現時，先前因「同類型第一個」而推定的預設要讓位，
            // 每種類型才會恰好一個預設串流
            if self.defaults_seen.get(&kind) == Some(&DefaultOrigin::Inferred) {
                self.demote_inferred_default(&kind);
            }
            self.defaults_seen.insert(kind.clone(), DefaultOrigin::Explicit);
        } else if is_default {
            self.defaults_seen.insert(kind.clone(), DefaultOrigin::Inferred);
        }

        self.ensure_input_group(input_number);

        let mut stream = StreamInfo {
            input_number,
            stream_number,
            kind,
            language,
            is_default,
            size: None,
            fps: None,
            bitrate_kbps: None,
            metadata: HashMap::new(),
        };

        if stream.kind == StreamKind::Video {
            stream.size = parse_video_size(detail, patterns);
            stream.bitrate_kbps = patterns
                .kbps
                .captures(detail)
                .and_then(|caps| caps[1].parse().ok());
            stream.fps = parse_frame_rate(detail, self.fps_source, patterns);
        }

        self.current_stream = Some(stream);
        self.state = ParserState::InStream;
        self.last_metadata_key = None;
    }

    fn start_chapter(&mut self, caps: &regex::Captures<'_>) {
        self.flush_stream();
        self.flush_chapter();

        let input_number: u32 = caps[1].parse().unwrap_or(0);
        self.ensure_input_group(input_number);

        self.current_chapter = Some(ChapterInfo {
            input_number,
            chapter_number: caps[2].parse().unwrap_or(0),
            start: caps[3].parse().unwrap_or(0.0),
            end: caps[4].parse().unwrap_or(0.0),
            metadata: HashMap::new(),
        });
        self.state = ParserState::InChapter;
        self.last_metadata_key = None;
    }

    /// 撤銷某類型先前被推定為預設的串流標記
    ///
    /// 呼叫點在 `flush_stream` 之後，候選串流都已收在輸入群組裡。
    fn demote_inferred_default(&mut self, kind: &StreamKind) {
        let groups = self.inputs.iter_mut().chain(self.current_input.as_mut());
        for group in groups {
            for stream in &mut group.streams {
                if &stream.kind == kind {
                    stream.is_default = false;
                }
            }
        }
    }

    /// 輸入編號改變時，將前一個輸入群組（含其章節）收進結果
    fn ensure_input_group(&mut self, input_number: u32) {
        match &self.current_input {
            Some(group) if group.input_number == input_number => {}
            Some(_) => {
                let previous = self.current_input.take();
                if let Some(group) = previous {
                    self.inputs.push(group);
                }
                self.current_input = Some(InputFileInfo {
                    input_number,
                    ..InputFileInfo::default()
                });
            }
            None => {
                self.current_input = Some(InputFileInfo {
                    input_number,
                    ..InputFileInfo::default()
                });
            }
        }
    }

    fn metadata_line(&mut self, trimmed: &str, target: MetadataTarget) {
        let Some((key, value)) = trimmed.split_once(':') else {
            return;
        };
        let key = key.trim();
        let value = value.trim().to_string();
        let last_key = self.last_metadata_key.clone();

        let map = match target {
            MetadataTarget::File => &mut self.info.metadata,
            MetadataTarget::Stream => match &mut self.current_stream {
                Some(stream) => &mut stream.metadata,
                None => return,
            },
            MetadataTarget::Chapter => match &mut self.current_chapter {
                Some(chapter) => &mut chapter.metadata,
                None => return,
            },
        };

        if key.is_empty() {
            // 鍵為空代表前一個欄位值的續行，以換行附加
            if let Some(last) = &last_key
                && let Some(existing) = map.get_mut(last)
            {
                existing.push('\n');
                existing.push_str(&value);
            }
            return;
        }

        map.entry(key.to_string())
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(&value);
            })
            .or_insert(value);
        self.last_metadata_key = Some(key.to_string());
    }

    fn flush_stream(&mut self) {
        let Some(stream) = self.current_stream.take() else {
            return;
        };

        match &stream.kind {
            StreamKind::Video => {
                self.info.has_video = true;
                // 片段層級欄位：只取預設串流的值，或在尚未設定時取第一個
                if stream.is_default || self.info.video_size.is_none() {
                    self.info.video_size = stream.size.or(self.info.video_size);
                }
                if stream.is_default || self.info.video_fps.is_none() {
                    self.info.video_fps = stream.fps.or(self.info.video_fps);
                }
                if stream.is_default || self.info.video_bitrate_kbps.is_none() {
                    self.info.video_bitrate_kbps =
                        stream.bitrate_kbps.or(self.info.video_bitrate_kbps);
                }
            }
            StreamKind::Audio => self.info.has_audio = true,
            _ => {}
        }

        if let Some(group) = &mut self.current_input {
            group.streams.push(stream);
        }
    }

    fn flush_chapter(&mut self) {
        let Some(chapter) = self.current_chapter.take() else {
            return;
        };
        if let Some(group) = &mut self.current_input {
            group.chapters.push(chapter);
        }
    }

    fn finalize(mut self) -> Result<MediaInfo> {
        self.flush_stream();
        self.flush_chapter();
        if let Some(group) = self.current_input.take() {
            self.inputs.push(group);
        }
        self.info.inputs = self.inputs;

        let duration = if self.check_duration {
            self.decode_time.or(self.raw_duration)
        } else {
            self.raw_duration
        };

        if self.info.has_video {
            self.info.duration = duration;
            self.info.frame_count = match (duration, self.info.video_fps) {
                (Some(duration), Some(fps)) => (duration * fps).floor() as u64,
                _ => 0,
            };
        } else {
            self.info.duration = None;
            self.info.frame_count = 1;
        }

        debug!(
            "診斷輸出解析完成: duration={:?}, size={:?}, fps={:?}, inputs={}",
            self.info.duration,
            self.info.video_size,
            self.info.video_fps,
            self.info.inputs.len()
        );

        Ok(self.info)
    }
}

#[derive(Clone, Copy)]
enum MetadataTarget {
    File,
    Stream,
    Chapter,
}

/// `HH:MM:SS.cc` 時鐘字串轉秒數
fn clock_to_seconds(caps: &regex::Captures<'_>) -> Option<f64> {
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let centis: f64 = caps[4].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds + centis / 100.0)
}

/// 從視訊串流的描述欄位中找出 `WxH` 尺寸
///
/// 描述以逗號分隔，逐一比對可避免把 `0x7f...` 這類十六進位
/// 位址誤認為尺寸。
fn parse_video_size(detail: &str, patterns: &Patterns) -> Option<(u32, u32)> {
    detail.split(", ").find_map(|token| {
        let caps = patterns.size.captures(token.trim())?;
        let width: u32 = caps[1].parse().ok()?;
        let height: u32 = caps[2].parse().ok()?;
        (width > 0 && height > 0).then_some((width, height))
    })
}

fn parse_frame_rate(detail: &str, source: FpsSource, patterns: &Patterns) -> Option<f64> {
    let fps = patterns
        .fps
        .captures(detail)
        .and_then(|caps| caps[1].parse::<f64>().ok());
    let tbr = patterns
        .tbr
        .captures(detail)
        .and_then(|caps| parse_tbr(&caps[1]));

    let chosen = match source {
        FpsSource::Fps => fps.or(tbr),
        FpsSource::Tbr => tbr.or(fps),
    };
    chosen.map(correct_drop_frame)
}

/// `tbr` 可能帶 `k` 後綴（例如 `90k tbr`）
fn parse_tbr(token: &str) -> Option<f64> {
    if let Some(stripped) = token.strip_suffix('k') {
        stripped.parse::<f64>().ok().map(|value| value * 1000.0)
    } else {
        token.parse().ok()
    }
}

/// drop-frame 幀率修正
///
/// 解碼器把 24000/1001 這類速率四捨五入成 23.98 回報；
/// 與名義速率·1000/1001 相差不到 0.01 時，吸附回精確值。
fn correct_drop_frame(fps: f64) -> f64 {
    for nominal in [23.0_f64, 24.0, 25.0, 30.0, 50.0] {
        let target = nominal * 1000.0 / 1001.0;
        if (fps - target).abs() < 0.01 && fps != target {
            return target;
        }
    }
    fps
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Input #0, matroska,webm, from 'movie.mkv':
  Metadata:
    title           : 測試影片
    DESCRIPTION     : first line
                    : second line
  Duration: 00:00:22.00, start: 0.000000, bitrate: 2300 kb/s
  Chapters:
    Chapter #0:0: start 0.000000, end 10.000000
      Metadata:
        title           : Opening
    Chapter #0:1: start 10.000000, end 22.000000
      Metadata:
        title           : Main
  Stream #0:0[0x1](und): Video: h264 (High), yuv420p(progressive), 1280x720 [SAR 1:1 DAR 16:9], 2100 kb/s, 23.98 fps, 23.98 tbr, 90k tbn
    Metadata:
      handler_name    : VideoHandler
  Stream #0:1(eng): Audio: aac (LC), 48000 Hz, stereo, fltp, 192 kb/s (default)
  Stream #0:2(fre): Audio: aac (LC), 48000 Hz, stereo, fltp, 128 kb/s
";

    #[test]
    fn test_parse_duration_and_bitrate() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        assert_eq!(info.duration, Some(22.0));
        assert_eq!(info.bitrate_kbps, Some(2300));
    }

    #[test]
    fn test_parse_video_stream_fields() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        assert!(info.has_video);
        assert!(info.has_audio);
        assert_eq!(info.video_size, Some((1280, 720)));
        assert_eq!(info.video_bitrate_kbps, Some(2100));
    }

    #[test]
    fn test_drop_frame_correction_snaps_to_exact_rate() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        assert_eq!(info.video_fps, Some(24000.0 / 1001.0));
    }

    #[test]
    fn test_exact_nominal_rate_is_untouched() {
        let text = "\
Input #0, avi, from 'clip.avi':
  Duration: 00:01:00.00, start: 0.000000, bitrate: 900 kb/s
  Stream #0:0: Video: mpeg4, yuv420p, 640x480, 25 fps, 25 tbr, 25 tbn
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        assert_eq!(info.video_fps, Some(25.0));
    }

    #[test]
    fn test_2997_snaps_to_ntsc_rate() {
        assert_eq!(correct_drop_frame(29.97), 30000.0 / 1001.0);
        assert_eq!(correct_drop_frame(23.98), 24000.0 / 1001.0);
        assert_eq!(correct_drop_frame(25.0), 25.0);
    }

    #[test]
    fn test_tbr_fallback_when_fps_absent() {
        let text = "\
Input #0, mpegts, from 'clip.ts':
  Duration: 00:00:10.00, start: 0.000000, bitrate: 1500 kb/s
  Stream #0:0: Video: h264, yuv420p, 720x576, 50 tbr, 90k tbn
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        assert_eq!(info.video_fps, Some(50.0));
    }

    #[test]
    fn test_tbr_preference_over_fps() {
        let text = "\
Input #0, mpegts, from 'clip.ts':
  Duration: 00:00:10.00, start: 0.000000, bitrate: 1500 kb/s
  Stream #0:0: Video: h264, yuv420p, 720x576, 30 fps, 50 tbr, 90k tbn
";
        let info = parse_diagnostics(text, FpsSource::Tbr, false).unwrap();
        assert_eq!(info.video_fps, Some(50.0));
    }

    #[test]
    fn test_first_stream_of_type_becomes_default() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        let streams = &info.inputs[0].streams;

        // 視訊串流沒有明確標記，但作為該類型的第一個成為預設
        assert!(streams[0].is_default);
        // 明確標記 (default) 的音訊串流
        assert!(streams[1].is_default);
        // 同類型已有預設，不再推定
        assert!(!streams[2].is_default);

        // 不變量：每種類型恰好一個預設串流
        let default_audio = streams
            .iter()
            .filter(|s| s.kind == StreamKind::Audio && s.is_default)
            .count();
        assert_eq!(default_audio, 1);
    }

    #[test]
    fn test_explicit_default_demotes_inferred() {
        let text = "\
Input #0, matroska,webm, from 'movie.mkv':
  Duration: 00:00:30.00, start: 0.000000, bitrate: 1800 kb/s
  Stream #0:0: Video: h264, yuv420p, 1280x720, 24 fps, 24 tbr, 1k tbn
  Stream #0:1(eng): Audio: aac (LC), 48000 Hz, stereo, fltp, 192 kb/s
  Stream #0:2(fre): Audio: aac (LC), 48000 Hz, stereo, fltp, 128 kb/s (default)
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        let streams = &info.inputs[0].streams;

        // eng 音訊先被推定為預設，fre 的明確標記出現後必須讓位
        assert!(!streams[1].is_default);
        assert!(streams[2].is_default);

        let default_audio = streams
            .iter()
            .filter(|s| s.kind == StreamKind::Audio && s.is_default)
            .count();
        assert_eq!(default_audio, 1, "每種串流類型應恰好一個預設");
    }

    #[test]
    fn test_language_und_maps_to_none() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        let streams = &info.inputs[0].streams;
        assert_eq!(streams[0].language, None);
        assert_eq!(streams[1].language.as_deref(), Some("eng"));
        assert_eq!(streams[2].language.as_deref(), Some("fre"));
    }

    #[test]
    fn test_chapters_grouped_with_metadata() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        let chapters = &info.inputs[0].chapters;
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].start, 0.0);
        assert_eq!(chapters[0].end, 10.0);
        assert_eq!(chapters[0].metadata.get("title").map(String::as_str), Some("Opening"));
        assert_eq!(chapters[1].chapter_number, 1);
        assert_eq!(chapters[1].metadata.get("title").map(String::as_str), Some("Main"));
    }

    #[test]
    fn test_file_metadata_with_continuation() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        assert_eq!(info.metadata.get("title").map(String::as_str), Some("測試影片"));
        // 空欄位名的行是前一個值的續行，以換行附加
        assert_eq!(
            info.metadata.get("DESCRIPTION").map(String::as_str),
            Some("first line\nsecond line")
        );
    }

    #[test]
    fn test_stream_metadata_attached_to_stream() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        let video = &info.inputs[0].streams[0];
        assert_eq!(
            video.metadata.get("handler_name").map(String::as_str),
            Some("VideoHandler")
        );
    }

    #[test]
    fn test_frame_count_derivation() {
        let info = parse_diagnostics(SAMPLE, FpsSource::Fps, false).unwrap();
        // floor(22 · 24000/1001) = floor(527.47...) = 527
        assert_eq!(info.frame_count, 527);
    }

    #[test]
    fn test_no_video_stream() {
        let text = "\
Input #0, mp3, from 'song.mp3':
  Duration: 00:03:20.00, start: 0.000000, bitrate: 320 kb/s
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 320 kb/s
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        assert!(!info.has_video);
        assert!(info.has_audio);
        // 沒有視訊串流時時長為 None、幀數為 1
        assert_eq!(info.duration, None);
        assert_eq!(info.frame_count, 1);
    }

    #[test]
    fn test_input_number_change_finalizes_group() {
        let text = "\
Input #0, mov, from 'a.mov':
  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s
  Stream #0:0: Video: h264, yuv420p, 640x360, 30 fps, 30 tbr, 90k tbn
Input #1, mov, from 'b.mov':
  Duration: 00:00:05.00, start: 0.000000, bitrate: 800 kb/s
  Stream #1:0: Video: h264, yuv420p, 320x240, 25 fps, 25 tbr, 90k tbn
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        assert_eq!(info.inputs.len(), 2);
        assert_eq!(info.inputs[0].input_number, 0);
        assert_eq!(info.inputs[0].streams.len(), 1);
        assert_eq!(info.inputs[1].input_number, 1);
        assert_eq!(info.inputs[1].streams[0].size, Some((320, 240)));
        // 第一個輸入的視訊串流已是預設，片段層級欄位不被後者覆寫
        assert_eq!(info.video_size, Some((640, 360)));
    }

    #[test]
    fn test_decode_time_marker_wins_when_requested() {
        let text = "\
Input #0, mov, from 'a.mov':
  Duration: 00:10:00.00, start: 0.000000, bitrate: 1000 kb/s
  Stream #0:0: Video: h264, yuv420p, 640x360, 30 fps, 30 tbr, 90k tbn
Output #0, null, to 'pipe:':
frame=  100 fps= 30 q=-0.0 size=N/A time=00:00:03.33 bitrate=N/A speed=1x
frame=  650 fps= 30 q=-0.0 size=N/A time=00:00:21.93 bitrate=N/A speed=1x
";
        let with_check = parse_diagnostics(text, FpsSource::Fps, true).unwrap();
        assert_eq!(with_check.duration, Some(21.93));

        let without_check = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        assert_eq!(without_check.duration, Some(600.0));
    }

    #[test]
    fn test_output_section_is_ignored() {
        let text = "\
Input #0, mov, from 'a.mov':
  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s
  Stream #0:0: Video: h264, yuv420p, 640x360, 30 fps, 30 tbr, 90k tbn
Output #0, image2, to 'out.png':
  Stream #0:0: Video: png, rgb24, 640x360, q=2-31, 200 kb/s, 30 fps, 30 tbn
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        // Output 段的串流不得混入結果
        assert_eq!(info.inputs.len(), 1);
        assert_eq!(info.inputs[0].streams.len(), 1);
    }

    #[test]
    fn test_duration_na_is_missing() {
        let text = "\
Input #0, h264, from 'raw.h264':
  Duration: N/A, bitrate: N/A
  Stream #0:0: Video: h264, yuv420p, 1920x1080, 25 fps, 25 tbr, 1200k tbn
";
        let info = parse_diagnostics(text, FpsSource::Fps, false).unwrap();
        assert!(info.has_video);
        assert_eq!(info.duration, None);
        assert_eq!(info.video_size, Some((1920, 1080)));
    }
}
