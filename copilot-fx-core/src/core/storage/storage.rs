use std::fs;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::storage;
use crate::core::storage::StorageError;

const TEMP_EXTENSION: &str = "tmp";

/// The storage module is responsible for storing and retrieving metric files from the file system.
///
/// All files are stored relative to the base path of the storage, which is the data directory
/// of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct Storage {
    base_path: PathBuf,
}

impl Storage {
    /// Creates and returns a new instance of `StorageOptions` for configuring storage operations.
    pub fn options(&self) -> StorageOptions {
        StorageOptions::new(self.base_path.clone())
    }

    /// The base path of this storage.
    pub fn path(&self) -> &Path {
        self.base_path.as_path()
    }

    /// Retrieve the filenames of all regular files within the storage.
    ///
    /// A missing storage directory is a valid empty state and returns no filenames.
    /// The returned filenames are sorted lexicographically.
    ///
    /// # Returns
    ///
    /// The sorted filenames within the storage, or a [StorageError] when the directory couldn't be read.
    pub fn filenames(&self) -> storage::Result<Vec<String>> {
        let absolute_path = self.base_path.to_str().unwrap_or_default();

        if !self.base_path.exists() {
            trace!("Storage directory {} doesn't exist, returning empty file list", absolute_path);
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageError::IO(absolute_path.to_string(), e.to_string()))?;
        let mut filenames: Vec<String> = Vec::new();

        for entry in entries {
            match entry {
                Ok(entry) => {
                    if entry.path().is_file() {
                        if let Some(filename) = entry.file_name().to_str() {
                            filenames.push(filename.to_string());
                        }
                    }
                }
                Err(e) => warn!("Unable to read directory entry, {}", e),
            }
        }

        filenames.sort();
        Ok(filenames)
    }

    /// Deletes a file at the specified filepath relative to the storage.
    ///
    /// # Arguments
    ///
    /// * `filepath` - The path to the file to be deleted.
    ///
    /// # Returns
    ///
    /// A `Result` indicating the success or failure of the operation.
    pub fn delete_path<P: AsRef<Path>>(&self, filepath: P) -> storage::Result<()> {
        Self::delete(self.base_path.join(filepath))
    }

    /// Delete the given path from the system.
    pub fn delete<P: AsRef<Path>>(path: P) -> storage::Result<()> {
        let path = path.as_ref();
        let absolute_path = path.to_str().unwrap_or_default();
        debug!("Deleting path {}", absolute_path);

        fs::remove_file(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(absolute_path.to_string())
            } else {
                StorageError::IO(absolute_path.to_string(), e.to_string())
            }
        })
    }
}

impl From<&str> for Storage {
    fn from(value: &str) -> Self {
        Self {
            base_path: PathBuf::from(value),
        }
    }
}

impl From<&Path> for Storage {
    fn from(value: &Path) -> Self {
        Self {
            base_path: value.to_path_buf(),
        }
    }
}

/// Options for configuring storage behavior.
#[derive(Debug)]
pub struct StorageOptions {
    path: PathBuf,
    make_dirs: bool,
}

impl StorageOptions {
    fn new<P: AsRef<Path>>(initial_path: P) -> Self {
        Self {
            path: PathBuf::from(initial_path.as_ref()),
            make_dirs: false,
        }
    }

    /// Sets whether the storage parent directories of the file should be created.
    ///
    /// # Arguments
    ///
    /// * `make_dirs` - A boolean indicating if parent directories should be created if they don't exist.
    pub fn make_dirs(mut self, make_dirs: bool) -> Self {
        self.make_dirs = make_dirs;
        self
    }

    /// Creates a `Serializer` storage instance with the provided filename.
    ///
    /// # Arguments
    ///
    /// * `filename` - The filename for the `SerializerStorage`.
    pub fn serializer<F: AsRef<str>>(self, filename: F) -> SerializerStorage {
        SerializerStorage {
            path: self.path.join(filename.as_ref()),
            make_dirs: self.make_dirs,
        }
    }
}

/// Storage for serializing and deserializing JSON data.
#[derive(Debug)]
pub struct SerializerStorage {
    path: PathBuf,
    make_dirs: bool,
}

impl SerializerStorage {
    /// Checks if the storage file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the stored data from the storage file.
    ///
    /// # Returns
    ///
    /// The deserialized data if successful, or a `StorageError` if reading failed.
    ///
    /// # Generic Parameters
    ///
    /// * `T` - The type to deserialize the stored data into.
    pub fn read<T>(self) -> storage::Result<T>
    where
        T: DeserializeOwned,
    {
        let absolute_path = self.absolute_path();
        let mut file = self.read_open()?;

        trace!("Reading storage file {}", absolute_path);
        let mut data = String::new();
        file.read_to_string(&mut data)
            .map_err(|e| StorageError::ReadingFailed(absolute_path.clone(), e.to_string()))?;

        match serde_json::from_str::<T>(data.as_str()) {
            Ok(e) => {
                debug!("File {} has been loaded", absolute_path);
                Ok(e)
            }
            Err(e) => {
                debug!("File {} is invalid, {}", absolute_path, &e);
                Err(StorageError::ReadingFailed(absolute_path, e.to_string()))
            }
        }
    }

    /// Writes the given value to the storage file.
    ///
    /// The value is serialized up-front and written to a temporary file which replaces the
    /// storage file only after all bytes have been written. A failed write never leaves a
    /// partially written storage file behind.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to write to the storage file.
    ///
    /// # Returns
    ///
    /// The path of the storage file if successful, or a `StorageError` if writing failed.
    pub fn write<T>(self, value: &T) -> storage::Result<PathBuf>
    where
        T: Serialize,
    {
        let absolute_path = self.absolute_path();

        trace!("Serializing storage data for {}", absolute_path);
        let data = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::WritingFailed(absolute_path.clone(), e.to_string()))?;

        self.create_parent_directories_if_needed()?;
        let temp_path = self.path.with_extension(TEMP_EXTENSION);

        trace!("Writing {} bytes to storage file {:?}", data.len(), temp_path);
        let write_result = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(temp_path.as_path())
            .and_then(|mut file| file.write_all(data.as_bytes()));
        if let Err(e) = write_result {
            let _ = fs::remove_file(temp_path.as_path());
            return Err(StorageError::WritingFailed(absolute_path, e.to_string()));
        }

        fs::rename(temp_path.as_path(), self.path.as_path()).map_err(|e| {
            let _ = fs::remove_file(temp_path.as_path());
            StorageError::WritingFailed(absolute_path.clone(), e.to_string())
        })?;

        debug!("Storage file {} has been saved", absolute_path);
        Ok(self.path)
    }

    fn absolute_path(&self) -> String {
        self.path.to_str().unwrap_or_default().to_string()
    }

    fn read_open(&self) -> storage::Result<fs::File> {
        trace!("Opening storage file {:?}", self.path);
        OpenOptions::new()
            .read(true)
            .open(self.path.as_path())
            .map_err(|e| {
                let absolute_path = self.absolute_path();
                trace!("File {} couldn't be opened, {}", absolute_path, e);

                if e.kind() == ErrorKind::NotFound {
                    StorageError::NotFound(absolute_path)
                } else {
                    StorageError::ReadingFailed(absolute_path, e.to_string())
                }
            })
    }

    fn create_parent_directories_if_needed(&self) -> storage::Result<()> {
        if self.make_dirs {
            if let Some(parent) = self.path.parent() {
                let parent_absolute_path = parent.to_str().unwrap_or_default();
                trace!("Creating parent directories {}", parent_absolute_path);
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("Failed to create parent directories, {}", e);
                    return Err(StorageError::IO(parent_absolute_path.to_string(), e.to_string()));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use crate::init_logger;
    use crate::testing::{read_test_file, write_test_file};

    use super::*;

    #[test]
    fn test_from_directory_should_use_given_path() {
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let expected_result = PathBuf::from(temp_path);

        let storage = Storage::from(temp_path);

        assert_eq!(expected_result, storage.base_path)
    }

    #[test]
    fn test_filenames() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        write_test_file(temp_dir.path(), "zulu.json", "[]");
        write_test_file(temp_dir.path(), "alpha.json", "[]");
        let storage = Storage::from(temp_path);

        let result = storage.filenames().expect("expected the filenames to have been read");

        assert_eq!(vec!["alpha.json".to_string(), "zulu.json".to_string()], result)
    }

    #[test]
    fn test_filenames_missing_directory() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let storage = Storage::from(temp_dir.path().join("lorem").as_path());

        let result = storage.filenames().expect("expected the filenames to have been read");

        assert_eq!(Vec::<String>::new(), result)
    }

    #[test]
    fn test_read() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        write_test_file(temp_dir.path(), "data.json", r#"{"lorem": "ipsum"}"#);
        let storage = Storage::from(temp_path);

        let result = storage
            .options()
            .serializer("data.json")
            .read::<HashMap<String, String>>()
            .expect("expected the storage file to have been read");

        assert_eq!(Some(&"ipsum".to_string()), result.get("lorem"))
    }

    #[test]
    fn test_read_invalid_contents() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        write_test_file(temp_dir.path(), "data.json", "lorem ipsum dolor");
        let storage = Storage::from(temp_path);

        let result = storage
            .options()
            .serializer("data.json")
            .read::<HashMap<String, String>>();

        match result.err().expect("expected an error to be returned") {
            StorageError::ReadingFailed(_, _) => {}
            _ => assert!(false, "expected StorageError::ReadingFailed to be returned"),
        }
    }

    #[test]
    fn test_read_not_found() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let storage = Storage::from(temp_path);

        let result = storage
            .options()
            .serializer("lorem-ipsum.json")
            .read::<HashMap<String, String>>();

        match result.err().expect("expected an error to be returned") {
            StorageError::NotFound(_) => {}
            _ => assert!(false, "expected StorageError::NotFound to be returned"),
        }
    }

    #[test]
    fn test_write() {
        init_logger!();
        let filename = "test.json";
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let storage = Storage::from(temp_path);
        let value: HashMap<String, String> =
            vec![("lorem".to_string(), "ipsum".to_string())].into_iter().collect();

        let result = storage
            .options()
            .serializer(filename)
            .write(&value)
            .expect("expected no error to have occurred");

        assert_eq!(temp_dir.path().join(filename), result);
        let contents = read_test_file(temp_dir.path(), filename);
        assert!(contents.contains("\"lorem\": \"ipsum\""), "expected the value to have been serialized, got {}", contents);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        init_logger!();
        let filename = "test.json";
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let storage = Storage::from(temp_path);
        let value = vec![1, 2, 3];

        storage
            .options()
            .serializer(filename)
            .write(&value)
            .expect("expected no error to have occurred");

        assert_eq!(vec![filename.to_string()], storage.filenames().unwrap())
    }

    #[test]
    fn test_write_invalid_storage() {
        init_logger!();
        let storage = Storage::from("/invalid/file/path");
        let value = vec![1, 2, 3];

        let result = storage.options().serializer("my-random-filename.json").write(&value);

        assert_eq!(true, result.is_err(), "expected an error to be returned");
        match result.err().unwrap() {
            StorageError::WritingFailed(_, _) => {}
            _ => assert!(false, "expected StorageError::WritingFailed to be returned"),
        }
    }

    #[test]
    fn test_write_make_dirs() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let storage = Storage::from(temp_dir.path().join("nested").as_path());
        let value = vec![1, 2, 3];

        let result = storage
            .options()
            .make_dirs(true)
            .serializer("data.json")
            .write(&value)
            .expect("expected no error to have occurred");

        assert!(result.exists(), "expected the storage file {:?} to exist", result)
    }

    #[test]
    fn test_delete_path() {
        init_logger!();
        let filename = "data.json";
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        write_test_file(temp_dir.path(), filename, "[]");
        let storage = Storage::from(temp_path);

        assert_eq!(Ok(()), storage.delete_path(filename));
        assert_eq!(false, temp_dir.path().join(filename).exists(), "expected the file to have been removed")
    }

    #[test]
    fn test_delete_path_not_found() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let storage = Storage::from(temp_path);

        let result = storage.delete_path("lorem.json");

        match result.err().expect("expected an error to be returned") {
            StorageError::NotFound(_) => {}
            _ => assert!(false, "expected StorageError::NotFound to be returned"),
        }
    }
}
