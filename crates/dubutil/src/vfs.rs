// dub-rs: a package-aware build orchestrator for the D language.
// Copyright (C) 2026 The dub-rs contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Disk access behind a trait so the cache and freshness logic can be
//! exercised against an in-memory tree.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use anyhow::{bail, Context};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

pub trait Filesystem: Send + Sync {
    /// The wall clock freshness decisions compare against; the mock keeps
    /// its own.
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
    fn getcwd(&self) -> anyhow::Result<PathBuf>;
    fn exists_file(&self, p: &Path) -> bool;
    fn exists_directory(&self, p: &Path) -> bool;
    fn mkdir_p(&self, p: &Path) -> anyhow::Result<()>;
    fn read_file(&self, p: &Path) -> anyhow::Result<Vec<u8>>;
    fn read_text(&self, p: &Path) -> anyhow::Result<String>;
    fn write_file(&self, p: &Path, data: &[u8]) -> anyhow::Result<()>;
    fn remove_file(&self, p: &Path, force: bool) -> anyhow::Result<()>;
    fn remove_dir(&self, p: &Path, force: bool) -> anyhow::Result<()>;
    fn iterate_directory(&self, p: &Path) -> anyhow::Result<Vec<DirEntryInfo>>;
    fn mtime(&self, p: &Path) -> anyhow::Result<SystemTime>;
    fn set_times(&self, p: &Path, mtime: SystemTime) -> anyhow::Result<()>;
    fn set_attributes(&self, p: &Path, mode: u32) -> anyhow::Result<()>;
    /// Links `from` to `to`, replacing `to`; degrades to a copy when the
    /// link cannot be created (cross-device, or unsupported).
    fn hard_link_file(&self, from: &Path, to: &Path) -> anyhow::Result<()>;
    fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()>;
    fn is_writable_dir(&self, p: &Path) -> bool;
}

pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn getcwd(&self) -> anyhow::Result<PathBuf> {
        Ok(std::env::current_dir()?)
    }

    fn exists_file(&self, p: &Path) -> bool {
        p.is_file()
    }

    fn exists_directory(&self, p: &Path) -> bool {
        p.is_dir()
    }

    fn mkdir_p(&self, p: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(p)
            .with_context(|| format!("failed to create directory `{}`", p.display()))
    }

    fn read_file(&self, p: &Path) -> anyhow::Result<Vec<u8>> {
        std::fs::read(p).with_context(|| format!("failed to read `{}`", p.display()))
    }

    fn read_text(&self, p: &Path) -> anyhow::Result<String> {
        std::fs::read_to_string(p).with_context(|| format!("failed to read `{}`", p.display()))
    }

    fn write_file(&self, p: &Path, data: &[u8]) -> anyhow::Result<()> {
        std::fs::write(p, data).with_context(|| format!("failed to write `{}`", p.display()))
    }

    fn remove_file(&self, p: &Path, force: bool) -> anyhow::Result<()> {
        match std::fs::remove_file(p) {
            Ok(()) => Ok(()),
            Err(e) if force && e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove `{}`", p.display())),
        }
    }

    fn remove_dir(&self, p: &Path, force: bool) -> anyhow::Result<()> {
        let res = if force {
            match std::fs::remove_dir_all(p) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        } else {
            std::fs::remove_dir(p)
        };
        res.with_context(|| format!("failed to remove directory `{}`", p.display()))
    }

    fn iterate_directory(&self, p: &Path) -> anyhow::Result<Vec<DirEntryInfo>> {
        let mut out = Vec::new();
        for entry in
            std::fs::read_dir(p).with_context(|| format!("failed to list `{}`", p.display()))?
        {
            let entry = entry?;
            out.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(out)
    }

    fn mtime(&self, p: &Path) -> anyhow::Result<SystemTime> {
        let md = std::fs::metadata(p)
            .with_context(|| format!("failed to stat `{}`", p.display()))?;
        Ok(md.modified()?)
    }

    fn set_times(&self, p: &Path, mtime: SystemTime) -> anyhow::Result<()> {
        let f = std::fs::OpenOptions::new()
            .append(true)
            .open(p)
            .with_context(|| format!("failed to open `{}`", p.display()))?;
        f.set_times(std::fs::FileTimes::new().set_modified(mtime))?;
        Ok(())
    }

    #[cfg(unix)]
    fn set_attributes(&self, p: &Path, mode: u32) -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(p, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to chmod `{}`", p.display()))
    }

    #[cfg(not(unix))]
    fn set_attributes(&self, p: &Path, mode: u32) -> anyhow::Result<()> {
        let mut perms = std::fs::metadata(p)?.permissions();
        perms.set_readonly(mode & 0o200 == 0);
        std::fs::set_permissions(p, perms)
            .with_context(|| format!("failed to set attributes on `{}`", p.display()))
    }

    fn hard_link_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        if to.exists() {
            std::fs::remove_file(to)
                .with_context(|| format!("failed to replace `{}`", to.display()))?;
        }
        if std::fs::hard_link(from, to).is_err() {
            std::fs::copy(from, to).with_context(|| {
                format!(
                    "failed to copy `{}` to `{}`",
                    from.display(),
                    to.display()
                )
            })?;
        }
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        std::fs::copy(from, to).with_context(|| {
            format!(
                "failed to copy `{}` to `{}`",
                from.display(),
                to.display()
            )
        })?;
        Ok(())
    }

    fn is_writable_dir(&self, p: &Path) -> bool {
        std::fs::metadata(p)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }
}

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone)]
pub enum FsEntry {
    Dir {
        entries: IndexMap<String, FsEntry>,
        mode: u32,
    },
    File {
        data: Vec<u8>,
        mtime: SystemTime,
        mode: u32,
    },
}

impl FsEntry {
    fn dir() -> FsEntry {
        FsEntry::Dir {
            entries: IndexMap::new(),
            mode: DEFAULT_DIR_MODE,
        }
    }

    fn file(data: Vec<u8>, mtime: SystemTime) -> FsEntry {
        FsEntry::File {
            data,
            mtime,
            mode: DEFAULT_FILE_MODE,
        }
    }
}

/// An in-memory filesystem rooted at `/`. Every operation resolves
/// relative paths against the mock cwd; drive prefixes are ignored so the
/// same fixtures work on every host.
pub struct MockFilesystem {
    root: Mutex<FsEntry>,
    cwd: Mutex<PathBuf>,
    /// Simulated wall clock, advanced by tests.
    now: Mutex<SystemTime>,
}

impl Default for MockFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFilesystem {
    pub fn new() -> MockFilesystem {
        MockFilesystem {
            root: Mutex::new(FsEntry::dir()),
            cwd: Mutex::new(PathBuf::from("/")),
            now: Mutex::new(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000)),
        }
    }

    pub fn chdir(&self, p: &Path) {
        *self.cwd.lock().unwrap() = self.absolute(p);
    }

    pub fn advance_clock(&self, by: std::time::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    fn absolute(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.lock().unwrap().join(p)
        }
    }

    fn components(&self, p: &Path) -> Vec<String> {
        self.absolute(p)
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn with_entry<R>(&self, p: &Path, f: impl FnOnce(Option<&FsEntry>) -> R) -> R {
        let root = self.root.lock().unwrap();
        let mut cur: &FsEntry = &root;
        for comp in self.components(p) {
            match cur {
                FsEntry::Dir { entries, .. } => match entries.get(&comp) {
                    Some(next) => cur = next,
                    None => return f(None),
                },
                FsEntry::File { .. } => return f(None),
            }
        }
        f(Some(cur))
    }

    fn with_entry_mut<R>(
        &self,
        p: &Path,
        create_dirs: bool,
        f: impl FnOnce(&mut IndexMap<String, FsEntry>, &str) -> R,
    ) -> anyhow::Result<R> {
        let comps = self.components(p);
        let Some((last, parents)) = comps.split_last() else {
            bail!("cannot operate on the filesystem root");
        };
        let mut root = self.root.lock().unwrap();
        let mut cur: &mut FsEntry = &mut root;
        for comp in parents {
            let FsEntry::Dir { entries, .. } = cur else {
                bail!("`{}` crosses a file", p.display());
            };
            if !entries.contains_key(comp) {
                if !create_dirs {
                    bail!("`{}` does not exist", p.display());
                }
                entries.insert(comp.clone(), FsEntry::dir());
            }
            cur = entries.get_mut(comp).unwrap();
        }
        let FsEntry::Dir { entries, .. } = cur else {
            bail!("`{}` crosses a file", p.display());
        };
        Ok(f(entries, last))
    }

    /// Materializes `(path, contents)` pairs as a whole tree.
    pub fn populate<'a>(
        &self,
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> anyhow::Result<()> {
        for (path, contents) in files {
            self.write_file(Path::new(path), contents.as_bytes())?;
        }
        Ok(())
    }

    /// Rebuilds a tree from an archive produced by
    /// [`snapshot_zip`](Self::snapshot_zip), so fixtures can live on disk.
    pub fn from_zip(bytes: &[u8]) -> anyhow::Result<MockFilesystem> {
        use std::io::Read;

        let fs = MockFilesystem::new();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = format!("/{}", entry.name());
            if entry.is_dir() {
                fs.mkdir_p(Path::new(name.trim_end_matches('/')))?;
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            fs.write_file(Path::new(&name), &data)?;
            if let Some(mode) = entry.unix_mode() {
                fs.set_attributes(Path::new(&name), mode)?;
            }
        }
        Ok(fs)
    }

    /// Serializes the whole tree to a zip archive, for on-disk fixtures.
    pub fn snapshot_zip(&self) -> anyhow::Result<Vec<u8>> {
        fn walk(
            zip: &mut zip::ZipWriter<std::io::Cursor<Vec<u8>>>,
            prefix: &str,
            entry: &FsEntry,
        ) -> anyhow::Result<()> {
            match entry {
                FsEntry::Dir { entries, .. } => {
                    if !prefix.is_empty() {
                        zip.add_directory(prefix, zip::write::FileOptions::default())?;
                    }
                    for (name, child) in entries {
                        let path = if prefix.is_empty() {
                            name.clone()
                        } else {
                            format!("{}/{}", prefix, name)
                        };
                        walk(zip, &path, child)?;
                    }
                }
                FsEntry::File { data, mode, .. } => {
                    let opts = zip::write::FileOptions::default().unix_permissions(*mode);
                    zip.start_file(prefix, opts)?;
                    zip.write_all(data)?;
                }
            }
            Ok(())
        }

        let buf = Vec::new();
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(buf));
        let root = self.root.lock().unwrap();
        walk(&mut zip, "", &root)?;
        let cursor = zip.finish()?;
        drop(root);
        Ok(cursor.into_inner())
    }
}

impl Filesystem for MockFilesystem {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }

    fn getcwd(&self) -> anyhow::Result<PathBuf> {
        Ok(self.cwd.lock().unwrap().clone())
    }

    fn exists_file(&self, p: &Path) -> bool {
        self.with_entry(p, |e| matches!(e, Some(FsEntry::File { .. })))
    }

    fn exists_directory(&self, p: &Path) -> bool {
        self.with_entry(p, |e| matches!(e, Some(FsEntry::Dir { .. })))
    }

    fn mkdir_p(&self, p: &Path) -> anyhow::Result<()> {
        self.with_entry_mut(p, true, |entries, last| {
            entries
                .entry(last.to_string())
                .or_insert_with(FsEntry::dir);
        })
    }

    fn read_file(&self, p: &Path) -> anyhow::Result<Vec<u8>> {
        self.with_entry(p, |e| match e {
            Some(FsEntry::File { data, .. }) => Ok(data.clone()),
            _ => bail!("`{}` does not exist", p.display()),
        })
    }

    fn read_text(&self, p: &Path) -> anyhow::Result<String> {
        Ok(String::from_utf8(self.read_file(p)?)?)
    }

    fn write_file(&self, p: &Path, data: &[u8]) -> anyhow::Result<()> {
        let now = self.now();
        self.with_entry_mut(p, true, |entries, last| {
            entries.insert(last.to_string(), FsEntry::file(data.to_vec(), now));
        })
    }

    fn remove_file(&self, p: &Path, force: bool) -> anyhow::Result<()> {
        let res = self.with_entry_mut(p, false, |entries, last| {
            if entries.shift_remove(last).is_none() && !force {
                bail!("`{}` does not exist", last);
            }
            Ok(())
        });
        match res {
            Ok(inner) => inner,
            Err(_) if force => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn remove_dir(&self, p: &Path, force: bool) -> anyhow::Result<()> {
        self.with_entry_mut(p, false, |entries, last| {
            match entries.get(last) {
                Some(FsEntry::Dir { entries: inner, .. }) => {
                    if !inner.is_empty() && !force {
                        bail!("directory `{}` is not empty", last);
                    }
                    entries.shift_remove(last);
                }
                Some(FsEntry::File { .. }) => bail!("`{}` is a file", last),
                None if force => {}
                None => bail!("`{}` does not exist", last),
            }
            Ok(())
        })?
    }

    fn iterate_directory(&self, p: &Path) -> anyhow::Result<Vec<DirEntryInfo>> {
        self.with_entry(p, |e| match e {
            Some(FsEntry::Dir { entries, .. }) => Ok(entries
                .iter()
                .map(|(name, e)| DirEntryInfo {
                    name: name.clone(),
                    is_dir: matches!(e, FsEntry::Dir { .. }),
                })
                .collect()),
            _ => bail!("`{}` is not a directory", p.display()),
        })
    }

    fn mtime(&self, p: &Path) -> anyhow::Result<SystemTime> {
        self.with_entry(p, |e| match e {
            Some(FsEntry::File { mtime, .. }) => Ok(*mtime),
            _ => bail!("`{}` does not exist", p.display()),
        })
    }

    fn set_times(&self, p: &Path, new_mtime: SystemTime) -> anyhow::Result<()> {
        self.with_entry_mut(p, false, |entries, last| match entries.get_mut(last) {
            Some(FsEntry::File { mtime, .. }) => {
                *mtime = new_mtime;
                Ok(())
            }
            _ => bail!("`{}` does not exist", last),
        })?
    }

    fn set_attributes(&self, p: &Path, new_mode: u32) -> anyhow::Result<()> {
        self.with_entry_mut(p, false, |entries, last| match entries.get_mut(last) {
            Some(FsEntry::File { mode, .. }) | Some(FsEntry::Dir { mode, .. }) => {
                *mode = new_mode;
                Ok(())
            }
            None => bail!("`{}` does not exist", last),
        })?
    }

    fn hard_link_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        // links degrade to copies in the mock; mtime carries over so
        // freshness results stay faithful
        let (data, mtime) = self.with_entry(from, |e| match e {
            Some(FsEntry::File { data, mtime, .. }) => Ok((data.clone(), *mtime)),
            _ => bail!("`{}` does not exist", from.display()),
        })?;
        self.with_entry_mut(to, true, |entries, last| {
            entries.insert(last.to_string(), FsEntry::file(data, mtime));
        })
    }

    fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        let data = self.read_file(from)?;
        self.write_file(to, &data)
    }

    fn is_writable_dir(&self, p: &Path) -> bool {
        self.with_entry(p, |e| match e {
            Some(FsEntry::Dir { mode, .. }) => mode & 0o200 != 0,
            _ => false,
        })
    }
}
